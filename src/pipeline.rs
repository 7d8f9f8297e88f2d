//! Turning one outfile into the alignment, seed lineage and tree outputs.
//!
//! Per input this writes:
//! - `<base>.fa` with every sequence, ancestral ones included
//! - `<base>.seedLineage.fa` with the sequences from the seed up to the root,
//!   followed by the naive sequence when the root is not the naive node
//! - `<base>.newick`

use crate::error::{OutfileError, Result};
use crate::io::{write_fasta, write_newick};
use crate::outfile::{DEFAULT_ID_WIDTH, ParseOptions, parse_outfile};
use crate::sequence::Sequence;
use crate::tree::{Tree, build_tree};
use log::info;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default pattern of the naive germline sequence.
pub const NAIVE_PATTERN: &str = ".*naive.*";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub outdir: PathBuf,
    /// Output basename; its stem is used. Defaults to the input file name.
    pub basename: Option<String>,
    pub seed: String,
    pub naive: String,
    /// Root the tree on the naive node before writing outputs.
    pub reroot: bool,
    pub id_width: usize,
    /// Gzip every output file.
    pub gzip: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            outdir: PathBuf::from("."),
            basename: None,
            seed: "seed".to_string(),
            naive: NAIVE_PATTERN.to_string(),
            reroot: false,
            id_width: DEFAULT_ID_WIDTH,
            gzip: false,
        }
    }
}

/// Paths produced for one input.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub alignment: PathBuf,
    pub seed_lineage: PathBuf,
    pub newick: PathBuf,
}

impl RunConfig {
    fn output_base(&self, input: &Path) -> PathBuf {
        let base = self
            .basename
            .as_deref()
            .map(Path::new)
            .unwrap_or(input)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "outfile".to_string());
        self.outdir.join(base)
    }

    fn output_path(&self, base: &Path, suffix: &str) -> PathBuf {
        let mut name = base.as_os_str().to_owned();
        name.push(suffix);
        if self.gzip {
            name.push(".gz");
        }
        PathBuf::from(name)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            seed: Some(self.seed.clone()),
            id_width: self.id_width,
        }
    }
}

/// Sequences from the seed up to the root, plus the naive sequence if the
/// root is not the naive node.
pub fn seed_lineage(tree: &Tree, seed: &str, naive: &str) -> Result<Vec<Sequence>> {
    let mut lineage: Vec<Sequence> = tree
        .lineage(&regex::escape(seed))?
        .map(|node| node.sequence.clone())
        .collect();

    if !Regex::new(naive)?.is_match(&tree.root_node().name) {
        if let Some(id) = tree.find_node(naive)? {
            lineage.push(tree[id].sequence.clone());
        }
    }
    Ok(lineage)
}

/// Parse `input`, build its tree and write every output.
pub fn process_outfile(input: &Path, config: &RunConfig) -> Result<Outputs> {
    let name = input.display().to_string();
    let t0 = Instant::now();
    let outfile = parse_outfile(input, &config.parse_options())?;
    if outfile.is_empty() {
        return Err(OutfileError::NoSequences { name });
    }
    info!(
        "{name}: read {} sequences in {:.3}s",
        outfile.sequences.len(),
        t0.elapsed().as_secs_f64()
    );

    let base = config.output_base(input);
    let outputs = Outputs {
        alignment: config.output_path(&base, ".fa"),
        seed_lineage: config.output_path(&base, ".seedLineage.fa"),
        newick: config.output_path(&base, ".newick"),
    };

    write_fasta(&outputs.alignment, &outfile.sequences)?;

    let t1 = Instant::now();
    let mut tree = build_tree(&outfile.sequences, &outfile.parents)?;
    if config.reroot {
        tree.reroot(&config.naive)?;
    }
    info!(
        "{name}: built tree rooted at '{}' in {:.3}s",
        tree.root_node().name,
        t1.elapsed().as_secs_f64()
    );

    let lineage = seed_lineage(&tree, &config.seed, &config.naive)?;
    write_fasta(&outputs.seed_lineage, &lineage)?;
    write_newick(&outputs.newick, &tree)?;
    info!("{name}: wrote {}", outputs.newick.display());

    Ok(outputs)
}
