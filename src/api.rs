//! Python binding layer for outfile parsing and lineage extraction.
//!
//! Provides Python functions reading PHYLIP `dnaml` / `dnapars` outfiles.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::outfile::{self, ParseOptions};
use crate::pipeline::NAIVE_PATTERN;
use crate::tree::build_tree;

fn value_error(e: crate::error::OutfileError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Parse a dnaml or dnapars outfile.
///
/// Args:
///     path: Path to the outfile
///     seed: Full seed name used to recover a truncated identifier (default: None)
///
/// Returns:
///     A tuple of (sequences, parents) where:
///     - sequences is a list of (id, residues) in outfile order
///     - parents maps each non-root id to (parent id, distance)
///
/// Raises:
///     ValueError: If the outfile cannot be read or is not valid dnaml/dnapars output
#[pyfunction]
#[pyo3(signature = (path, seed=None))]
fn parse_outfile(
    path: String,
    seed: Option<String>,
) -> PyResult<(Vec<(String, String)>, HashMap<String, (String, f64)>)> {
    let options = ParseOptions {
        seed,
        ..ParseOptions::default()
    };
    let outfile = outfile::parse_outfile(&path, &options).map_err(value_error)?;

    let parents = outfile
        .parents
        .iter()
        .map(|(child, edge)| (child.to_string(), (edge.parent.clone(), edge.distance)))
        .collect();
    let sequences = outfile
        .sequences
        .into_iter()
        .map(|s| (s.id, s.residues))
        .collect();

    Ok((sequences, parents))
}

/// Node ids from the seed up to the root of the outfile's tree.
///
/// Args:
///     path: Path to the outfile
///     seed: Seed id, expanded from its truncated form
///     naive: Regular expression of the naive sequence (default: ".*naive.*")
///     reroot: Root the tree on the naive sequence first (default: False)
///
/// Raises:
///     ValueError: If parsing or tree assembly fails
#[pyfunction]
#[pyo3(signature = (path, seed, naive=NAIVE_PATTERN.to_string(), reroot=false))]
fn seed_lineage(path: String, seed: String, naive: String, reroot: bool) -> PyResult<Vec<String>> {
    let options = ParseOptions::default().with_seed(seed.clone());
    let outfile = outfile::parse_outfile(&path, &options).map_err(value_error)?;
    let mut tree = build_tree(&outfile.sequences, &outfile.parents).map_err(value_error)?;
    if reroot {
        tree.reroot(&naive).map_err(value_error)?;
    }

    let lineage = crate::pipeline::seed_lineage(&tree, &seed, &naive).map_err(value_error)?;
    Ok(lineage.into_iter().map(|s| s.id).collect())
}

/// Python module definition
#[pymodule]
fn outfile_tree(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_outfile, m)?)?;
    m.add_function(wrap_pyfunction!(seed_lineage, m)?)?;
    Ok(())
}
