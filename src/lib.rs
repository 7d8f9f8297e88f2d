//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `outfile`: reading PHYLIP `dnaml` / `dnapars` outfiles into sequences and parent edges.
//! - `sequence`: sequences, parent maps and seed-name recovery.
//! - `tree`: arena tree assembly, node lookup, rerooting and lineage iteration.
//! - `io`: FASTA and Newick writers (optionally gzip-compressed).
//! - `pipeline`: one outfile in, alignment / seed lineage / tree files out.
//! - `error`: the shared error type.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod error;
pub mod io;
pub mod outfile;
pub mod pipeline;
pub mod sequence;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::{OutfileError, Result};
pub use outfile::{ParseOptions, parse_outfile};
pub use sequence::{Outfile, ParentEdge, ParentMap, Sequence};
pub use tree::{Tree, build_tree};
