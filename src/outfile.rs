//! Reading PHYLIP `dnaml` and `dnapars` outfiles.
//!
//! # Formats
//! Two textual layouts are recognized:
//!
//! - **dnaml** (verbose output with ancestral sequences, option 5): labeled
//!   sections. The reconstructed-sequence section lists every node with
//!   successive residue chunks; the branch table lists
//!   `<parent> <child> <length> ...` rows.
//! - **dnapars**: a per-tree state table that starts after the
//!   `From    To     Any Steps?    State at upper node` column header. It
//!   carries no branch lengths, so they are derived as Hamming distances.
//!
//! ```text
//!   node       Reconstructed sequence (caps if > 0.95)
//!
//!  152        sssssssssG AGGTGCAGCT GTTGGAGTCT GGGGGAGGCT TGGTACAGCC
//!  >naive2    sssssssssG AGGTGCAGCT GTTGGAGTCT GGGGGAGGCT TGGTACAGCC
//! ```
//!
//! # Detection
//! A file containing at least one dnaml section header is read as dnaml and
//! any structural problem in it is final. Only files without dnaml headers are
//! tried as dnapars; a file with neither is rejected.

use crate::error::{OutfileError, Result};
use crate::sequence::{Outfile, ParentEdge, ParentMap, SequenceSet, hamming};
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Identifier column width of PHYLIP formats.
pub const DEFAULT_ID_WIDTH: usize = 10;

/// Column header introducing each dnapars state table.
pub const DNAPARS_MARKER: &str = "From    To     Any Steps?    State at upper node";

const SEQUENCES_HEADER: &str = r"^\s+node\s+Reconstructed\s+sequence";
const PARENTS_HEADER: &str = r"^\s+Between\s+And\s+Length\s+Approx.\s+Confidence Limits";
const SEQUENCE_ROW: &str = r"^\s*(?P<id>[a-zA-Z0-9>_.-]*)\s+(?P<seq>[a-zA-Z \-]+)";
const PARENT_ROW: &str =
    r"^\s*(?P<parent>[0-9]+)\s+(?P<child>[a-zA-Z0-9>_.-]+)\s+(?P<distance>[0-9]+\.[0-9]+)";

/// Options controlling how an outfile is read.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Full seed name used to recover a truncated identifier.
    pub seed: Option<String>,
    /// Width at which the outfile truncated identifiers.
    pub id_width: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            seed: None,
            id_width: DEFAULT_ID_WIDTH,
        }
    }
}

impl ParseOptions {
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }
}

/// Which PHYLIP program produced an outfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Dnaml,
    Dnapars,
}

/// Parses the outfile at `path`.
pub fn parse_outfile<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Outfile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| OutfileError::io(path, e))?;
    parse_str(&content, &path.display().to_string(), options)
}

/// Parses outfile `content`; `name` identifies the input in error messages.
pub fn parse_str(content: &str, name: &str, options: &ParseOptions) -> Result<Outfile> {
    let scanner = DnamlScanner::new()?;
    let (format, mut outfile) = match scanner.detect(content) {
        Some(Format::Dnaml) => (Format::Dnaml, scanner.scan(content, name)?),
        Some(Format::Dnapars) => {
            warn!("{name}: no dnaml sections found, reading as dnapars output");
            (Format::Dnapars, parse_dnapars(content, name)?)
        }
        None => {
            return Err(OutfileError::UnrecognizedSection {
                name: name.to_string(),
            });
        }
    };
    debug!(
        "{name}: {format:?} output with {} sequences and {} parent edges",
        outfile.sequences.len(),
        outfile.parents.len()
    );

    if let Some(seed) = &options.seed {
        outfile.expand_seed(seed, options.id_width)?;
    }
    Ok(outfile)
}

/// Returns the format `content` would be read as, if any.
pub fn detect_format(content: &str) -> Result<Option<Format>> {
    Ok(DnamlScanner::new()?.detect(content))
}

// ============================================================================
// dnaml
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Sequences,
    Parents,
}

impl Section {
    /// Lines between the header and the first row.
    fn preamble(self) -> usize {
        match self {
            Section::Sequences => 1,
            Section::Parents => 2,
        }
    }
}

enum ScanState {
    Scanning,
    Preamble { section: Section, remaining: usize },
    Body(Section),
}

struct DnamlScanner {
    sequences_header: Regex,
    parents_header: Regex,
    sequence_row: Regex,
    parent_row: Regex,
}

impl DnamlScanner {
    fn new() -> Result<Self> {
        Ok(DnamlScanner {
            sequences_header: Regex::new(SEQUENCES_HEADER)?,
            parents_header: Regex::new(PARENTS_HEADER)?,
            sequence_row: Regex::new(SEQUENCE_ROW)?,
            parent_row: Regex::new(PARENT_ROW)?,
        })
    }

    fn detect(&self, content: &str) -> Option<Format> {
        if content.lines().any(|line| self.section_header(line).is_some()) {
            Some(Format::Dnaml)
        } else if content.contains(DNAPARS_MARKER) {
            Some(Format::Dnapars)
        } else {
            None
        }
    }

    fn section_header(&self, line: &str) -> Option<Section> {
        if self.sequences_header.is_match(line) {
            Some(Section::Sequences)
        } else if self.parents_header.is_match(line) {
            Some(Section::Parents)
        } else {
            None
        }
    }

    /// Reads every section of a dnaml outfile.
    ///
    /// The line that terminates a section body is consumed without being
    /// checked for a header.
    fn scan(&self, content: &str, name: &str) -> Result<Outfile> {
        let mut sequences = SequenceSet::default();
        let mut parents = ParentMap::new();
        let mut state = ScanState::Scanning;

        for (line_no, line) in (1..).zip(content.lines()) {
            state = match state {
                ScanState::Scanning => match self.section_header(line) {
                    Some(section) => ScanState::Preamble {
                        section,
                        remaining: section.preamble(),
                    },
                    None => ScanState::Scanning,
                },
                ScanState::Preamble { section, remaining } if remaining > 1 => {
                    ScanState::Preamble {
                        section,
                        remaining: remaining - 1,
                    }
                }
                ScanState::Preamble { section, .. } => ScanState::Body(section),
                ScanState::Body(Section::Sequences) => {
                    if let Some(caps) = self.sequence_row.captures(line) {
                        sequences.append(&caps["id"], &caps["seq"].replace(' ', ""));
                        ScanState::Body(Section::Sequences)
                    } else if line.trim_end().is_empty() {
                        ScanState::Body(Section::Sequences)
                    } else {
                        ScanState::Scanning
                    }
                }
                ScanState::Body(Section::Parents) => match self.parent_row.captures(line) {
                    Some(caps) => {
                        let distance = caps["distance"].parse::<f64>().map_err(|e| {
                            OutfileError::MalformedLine {
                                name: name.to_string(),
                                line: line_no,
                                reason: format!("invalid branch length '{}': {e}", &caps["distance"]),
                            }
                        })?;
                        parents.insert(
                            &caps["child"],
                            ParentEdge {
                                parent: caps["parent"].to_string(),
                                distance,
                            },
                        );
                        ScanState::Body(Section::Parents)
                    }
                    None => ScanState::Scanning,
                },
            };
        }

        let sequences = sequences.into_vec();
        // one parentless node is necessary, not sufficient, for a valid tree
        if parents.len() + 1 != sequences.len() {
            return Err(OutfileError::InvalidResults {
                name: name.to_string(),
                sequences: sequences.len(),
                parents: parents.len(),
            });
        }
        Ok(Outfile { sequences, parents })
    }
}

// ============================================================================
// dnapars
// ============================================================================

const DNAPARS_ROOT: &str = "root";

struct StateRow<'a> {
    name: &'a str,
    parent: Option<&'a str>,
    residues: String,
}

fn parse_state_row<'a>(line: &'a str, name: &str, line_no: usize) -> Result<StateRow<'a>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(OutfileError::MalformedLine {
            name: name.to_string(),
            line: line_no,
            reason: format!("expected at least a node and a name column, found '{}'", line.trim()),
        });
    }
    let (parent, offset) = match fields[0] {
        DNAPARS_ROOT => (None, 2),
        parent => (Some(parent), 3),
    };
    Ok(StateRow {
        name: fields[1],
        parent,
        residues: fields.get(offset..).map(|f| f.concat()).unwrap_or_default(),
    })
}

/// Reads the first state table of a dnapars outfile.
///
/// Sub-blocks are separated by one blank line and the table ends at two
/// consecutive blank lines. The first sub-block introduces every node; later
/// ones continue the residues of already known nodes.
fn parse_dnapars(content: &str, name: &str) -> Result<Outfile> {
    let Some(start) = content.find(DNAPARS_MARKER) else {
        return Err(OutfileError::UnrecognizedSection {
            name: name.to_string(),
        });
    };
    let trees = content.matches(DNAPARS_MARKER).count();
    if trees > 1 {
        info!("{name}: {trees} most parsimonious trees reported, using the first one");
    }

    let first_line = content[..start].matches('\n').count() + 1;
    let rest = &content[start + DNAPARS_MARKER.len()..];
    let block = match rest.find(DNAPARS_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    };

    let mut sequences = SequenceSet::default();
    let mut edges: Vec<(String, String)> = Vec::new();
    let mut sub_block = 0;
    let mut rows_in_block = 0;
    let mut blank_run = 0;

    // first yielded line is the remainder of the marker line
    for (offset, line) in block.lines().enumerate().skip(1) {
        let line_no = first_line + offset;
        if line.trim().is_empty() {
            blank_run += 1;
            if rows_in_block > 0 {
                sub_block += 1;
                rows_in_block = 0;
            }
            if blank_run >= 2 && sub_block > 0 {
                break;
            }
            continue;
        }
        blank_run = 0;
        if line.trim_start().starts_with('(') {
            // legend line, e.g. "( . means same as in the node below it on tree)"
            continue;
        }

        let row = parse_state_row(line, name, line_no)?;
        rows_in_block += 1;
        if sub_block == 0 {
            sequences.append(row.name, &row.residues);
            if let Some(parent) = row.parent {
                edges.push((row.name.to_string(), parent.to_string()));
            }
        } else if sequences.contains(row.name) {
            sequences.append(row.name, &row.residues);
        } else {
            return Err(OutfileError::MalformedLine {
                name: name.to_string(),
                line: line_no,
                reason: format!("residues for node '{}' that was never introduced", row.name),
            });
        }
    }

    let mut parents = ParentMap::new();
    for (child, parent) in edges {
        let (Some(child_seq), Some(parent_seq)) = (sequences.get(&child), sequences.get(&parent))
        else {
            return Err(OutfileError::UnknownParent { child, parent });
        };
        let distance = hamming(&child_seq.residues, &parent_seq.residues) as f64;
        parents.insert(child, ParentEdge { parent, distance });
    }

    Ok(Outfile {
        sequences: sequences.into_vec(),
        parents,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DNAML: &str = "\
Maximum likelihood method

  Between        And            Length      Approx. Confidence Limits
  -------        ---            ------      ------- ---------- ------

     2          >naive2           0.01208     (     zero,     0.02525) **
     2             1              0.00500     (     zero,     0.01200) **
     1          seqseedABC        0.02000     (     zero,     0.04000) **
     1          leafB             0.01000     (     zero,     0.02000) **

ln Likelihood =  -123.45

Probable sequences at interior nodes:

  node       Reconstructed sequence (caps if > 0.95)

 >naive2    AGGTGCAGCT GTTGG
 seqseedABC AGGTGCAGTT GTTGG
 leafB      AGGTGCAGCT GATGG
    2       AGGTGCAGCT GTTGG
    1       AGGTGCAGCT GTTGG

 >naive2    ACGTA
 seqseedABC ACGTT
 leafB      ACGTA
    2       ACGTA
    1       ACGTA

";

    pub(crate) const DNAPARS: &str = "\
One most parsimonious tree found:

requires a total of      3.000

From    To     Any Steps?    State at upper node

  root      1         AGGTGCAGCT GTTGG
    1   >naive2  no   AGGTGCAGCT GTTGG
    1       2   yes   AGGTGCAGTT GTTGG
    2   seqseedABC yes  AGGTGCAGTT GATGG
    2    leafB   yes   AGGTGCAGTT GTTGG

  root      1         ACGTA
    1   >naive2  no   ACGTA
    1       2    no   ACGTA
    2   seqseedABC yes  ACGTT
    2    leafB    no   ACGTA


From    To     Any Steps?    State at upper node

  root      1         AAAAAAAAAA AAAAA
";

    fn options() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn detects_formats() {
        assert_eq!(detect_format(DNAML).unwrap(), Some(Format::Dnaml));
        assert_eq!(detect_format(DNAPARS).unwrap(), Some(Format::Dnapars));
        assert_eq!(detect_format("nothing to see\n").unwrap(), None);
    }

    #[test]
    fn dnaml_sequences_accumulate_across_chunks() {
        let out = parse_str(DNAML, "dnaml.out", &options()).unwrap();
        let ids: Vec<&str> = out.sequences.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![">naive2", "seqseedABC", "leafB", "2", "1"]);
        assert_eq!(out.sequence("seqseedABC").unwrap().residues, "AGGTGCAGTTGTTGGACGTT");
        assert_eq!(out.sequence("2").unwrap().residues, "AGGTGCAGCTGTTGGACGTA");
    }

    #[test]
    fn dnaml_parent_count_is_one_less_than_sequences() {
        let out = parse_str(DNAML, "dnaml.out", &options()).unwrap();
        assert_eq!(out.parents.len(), out.sequences.len() - 1);

        let edge = out.parents.get(">naive2").unwrap();
        assert_eq!(edge.parent, "2");
        assert!((edge.distance - 0.01208).abs() < 1e-12);
        assert!(!out.parents.contains("2"));
    }

    #[test]
    fn dnaml_sections_repeat_and_accumulate() {
        let text = "
  node       Reconstructed sequence

   1        ACGT
   a        ACGA
stop
  node       Reconstructed sequence

   1        TT
   a        TA
stop
  Between        And            Length      Approx. Confidence Limits
  -------        ---            ------      ------- ---------- ------

     1          a               0.10000     (     zero,     0.20000)
";
        let out = parse_str(text, "repeat.out", &options()).unwrap();
        assert_eq!(out.sequence("1").unwrap().residues, "ACGTTT");
        assert_eq!(out.sequence("a").unwrap().residues, "ACGATA");
        assert_eq!(out.parents.len(), 1);
    }

    #[test]
    fn dnaml_count_mismatch_is_fatal() {
        let text = DNAML.replace(
            "     1          leafB             0.01000     (     zero,     0.02000) **\n",
            "",
        );
        let err = parse_str(&text, "broken.out", &options()).unwrap_err();
        assert!(matches!(
            err,
            OutfileError::InvalidResults {
                sequences: 5,
                parents: 3,
                ..
            }
        ));
        let msg = err.to_string();
        assert!(msg.contains("broken.out"));
        assert!(msg.contains("5 sequences vs 3 parent edges"));
    }

    #[test]
    fn dnaml_expands_seed() {
        let opts = options().with_seed("clone7-seqseedABC-full");
        let out = parse_str(DNAML, "dnaml.out", &opts).unwrap();
        assert!(out.sequence("clone7-seqseedABC-full").is_some());
        assert_eq!(out.parents.get("clone7-seqseedABC-full").unwrap().parent, "1");
    }

    #[test]
    fn dnaml_seed_failure_does_not_fall_back() {
        let opts = options().with_seed("unrelated");
        let err = parse_str(DNAML, "dnaml.out", &opts).unwrap_err();
        assert!(matches!(err, OutfileError::SeedNotFound { .. }));
    }

    #[test]
    fn dnapars_reads_first_tree_only() {
        let out = parse_str(DNAPARS, "dnapars.out", &options()).unwrap();
        let ids: Vec<&str> = out.sequences.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", ">naive2", "2", "seqseedABC", "leafB"]);
        assert_eq!(out.sequence("1").unwrap().residues, "AGGTGCAGCTGTTGGACGTA");
        assert_eq!(out.parents.len(), 4);
        assert!(!out.parents.contains("1"));
    }

    #[test]
    fn dnapars_distances_are_hamming() {
        let out = parse_str(DNAPARS, "dnapars.out", &options()).unwrap();
        let distance = |id: &str| out.parents.get(id).unwrap().distance;
        assert_eq!(distance(">naive2"), 0.0);
        assert_eq!(distance("2"), 1.0);
        assert_eq!(distance("seqseedABC"), 2.0);
        assert_eq!(distance("leafB"), 0.0);
    }

    #[test]
    fn dnapars_expands_seed() {
        let opts = options().with_seed("seqseedABC_long");
        let out = parse_str(DNAPARS, "dnapars.out", &opts).unwrap();
        assert_eq!(out.parents.get("seqseedABC_long").unwrap().parent, "2");
    }

    #[test]
    fn dnapars_table_stops_at_next_tree() {
        let text = "\
From    To     Any Steps?    State at upper node
                            ( . means same as in the node below it on tree)

  root      1         ACGT
    1       a    yes  ACGA
    1       b    no   ACGT

  root      1         TT
    1       a    no   TT
    1       b    yes  TA

From    To     Any Steps?    State at upper node

  root      1         GGGG
    1       c    no   GGGG
";
        let out = parse_str(text, "two-trees.out", &options()).unwrap();
        let ids: Vec<&str> = out.sequences.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "a", "b"]);
        assert_eq!(out.sequence("a").unwrap().residues, "ACGATT");
        assert_eq!(out.parents.get("a").unwrap().distance, 1.0);
        assert_eq!(out.parents.get("b").unwrap().distance, 1.0);
    }

    #[test]
    fn dnaml_too_many_edges_reports_counts() {
        let text = DNAML.replace(
            "     1          leafB ",
            "     1          ghost             0.03000     (     zero,     0.04000) **\n     1          leafB ",
        );
        let err = parse_str(&text, "extra.out", &options()).unwrap_err();
        assert!(matches!(
            err,
            OutfileError::InvalidResults {
                sequences: 5,
                parents: 5,
                ..
            }
        ));
        assert!(err.to_string().contains("5 sequences vs 5 parent edges"));
    }

    #[test]
    fn dnapars_unknown_continuation_row_is_fatal() {
        let text = "\
From    To     Any Steps?    State at upper node
  root      1         ACGT
    1       a    no   ACGT

  root      1         AC
    1       b    no   AC
";
        let err = parse_str(text, "bad.out", &options()).unwrap_err();
        assert!(matches!(err, OutfileError::MalformedLine { line: 6, .. }));
    }

    #[test]
    fn dnapars_parent_must_be_a_node() {
        let text = "\
From    To     Any Steps?    State at upper node
  root      1         ACGT
    7       a    no   ACGT
";
        let err = parse_str(text, "bad.out", &options()).unwrap_err();
        assert!(matches!(err, OutfileError::UnknownParent { .. }));
    }

    #[test]
    fn unrecognized_input_is_fatal() {
        let err = parse_str("hello\nworld\n", "junk.out", &options()).unwrap_err();
        assert!(matches!(err, OutfileError::UnrecognizedSection { .. }));
        assert!(err.to_string().contains("junk.out"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = parse_outfile("/nonexistent/outfile", &options()).unwrap_err();
        assert!(matches!(err, OutfileError::Io { .. }));
    }
}
