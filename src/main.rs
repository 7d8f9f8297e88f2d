use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use outfile_tree::outfile::DEFAULT_ID_WIDTH;
use outfile_tree::pipeline::{NAIVE_PATTERN, RunConfig, process_outfile};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Given outfiles of the PHYLIP tools `dnaml` or `dnapars`, write an alignment
/// (ancestral sequences included), the seed lineage and a Newick tree.
#[derive(Parser, Debug)]
#[command(name = "outfile2tree", version, about = "Ancestral sequences and trees from PHYLIP outfiles")]
struct Args {
    /// dnaml outfile (verbose output with inferred ancestral sequences, option 5) or dnapars outfile
    #[arg(short = 'i', long = "phylip-outfile", num_args = 1.., default_value = "outfile", value_parser = existing_file)]
    inputs: Vec<PathBuf>,

    /// Output directory where results are left
    #[arg(short = 'o', long = "outdir", default_value = ".")]
    outdir: PathBuf,

    /// Basename of output files [default: basename of the outfile]
    #[arg(long = "basename")]
    basename: Option<String>,

    /// Id of the seed leaf
    #[arg(long = "seed", default_value = "seed")]
    seed: String,

    /// Regular expression matching the naive germline sequence
    #[arg(long = "naive", default_value = NAIVE_PATTERN)]
    naive: String,

    /// Reroot the tree on the naive sequence before writing outputs
    #[arg(long = "reroot", default_value_t = false)]
    reroot: bool,

    /// Width at which the outfile truncates identifiers
    #[arg(long = "id-width", default_value_t = DEFAULT_ID_WIDTH)]
    id_width: usize,

    /// Gzip-compress all outputs
    #[arg(long = "gzip", default_value_t = false)]
    gzip: bool,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn existing_file(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("Invalid file: {arg}"))
    }
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            outdir: self.outdir.clone(),
            basename: self.basename.clone(),
            seed: self.seed.clone(),
            naive: self.naive.clone(),
            reroot: self.reroot,
            id_width: self.id_width,
            gzip: self.gzip,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if args.basename.is_some() && args.inputs.len() > 1 {
        bail!("--basename can only be used with a single outfile");
    }
    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create output directory {:?}", args.outdir))?;

    let t0 = Instant::now();
    let config = args.run_config();

    // Each outfile is independent; failures are reported per file
    let results: Vec<_> = args
        .inputs
        .par_iter()
        .map(|input| {
            process_outfile(input, &config)
                .with_context(|| format!("Failed to process {}", input.display()))
        })
        .collect();

    let mut failed = 0;
    for result in &results {
        if let Err(e) = result {
            error!("{e:#}");
            failed += 1;
        }
    }
    info!(
        "Processed {} outfiles in {:.3}s",
        results.len() - failed,
        t0.elapsed().as_secs_f64()
    );

    if failed > 0 {
        bail!("{failed} of {} outfiles failed", results.len());
    }
    Ok(())
}
