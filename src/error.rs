//! Error type shared by the outfile parser, the tree assembly and the writers.
//!
//! Every variant is fatal for the input file being processed: callers abort
//! that file and move on. Missing or ambiguous node lookups are *not* errors,
//! they are logged as warnings by [`crate::tree::Tree::find_node`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutfileError>;

#[derive(Debug, Error)]
pub enum OutfileError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Neither dnaml section headers nor a dnapars state table were found.
    #[error("unrecognized phylip section in {name}: no dnaml or dnapars results found")]
    UnrecognizedSection { name: String },

    #[error(
        "invalid results attempting to parse {name}: {sequences} sequences vs {parents} parent edges, expected exactly one parentless sequence"
    )]
    InvalidResults {
        name: String,
        sequences: usize,
        parents: usize,
    },

    #[error("No sequences were available in {name}; are you sure this is a dnaml output file?")]
    NoSequences { name: String },

    #[error("malformed line {line} in {name}: {reason}")]
    MalformedLine {
        name: String,
        line: usize,
        reason: String,
    },

    #[error("seed not found: no {width}-character id is a substring of '{seed}'")]
    SeedNotFound { seed: String, width: usize },

    #[error("too many seed substring matches for '{seed}': {}", .matches.join(", "))]
    AmbiguousSeed { seed: String, matches: Vec<String> },

    #[error("parent '{parent}' of '{child}' is not a known sequence")]
    UnknownParent { child: String, parent: String },

    #[error("The tree is not properly rooted; expected a single root but there are {0}.")]
    RootCount(usize),

    #[error("tree is disconnected: only {reachable} of {total} nodes are reachable from the root")]
    Disconnected { reachable: usize, total: usize },

    #[error("invalid node pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to write newick: {0}")]
    Newick(String),
}

impl OutfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        OutfileError::Io {
            path: path.into(),
            source,
        }
    }
}
