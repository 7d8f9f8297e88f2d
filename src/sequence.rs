//! Sequences and parent edges recovered from a PHYLIP outfile.
//!
//! Both containers keep encounter order: downstream FASTA output and tree
//! assembly iterate in the order nodes first appeared in the outfile.

use crate::error::{OutfileError, Result};
use log::warn;
use std::collections::HashMap;

/// A named residue string (extant leaf or reconstructed ancestor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub id: String,
    pub residues: String,
}

impl Sequence {
    pub fn new(id: impl Into<String>, residues: impl Into<String>) -> Self {
        Sequence {
            id: id.into(),
            residues: residues.into(),
        }
    }
}

/// Incoming edge of a node: who its parent is and how far away.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentEdge {
    pub parent: String,
    /// Substitution count (dnapars) or model distance (dnaml); non-negative.
    pub distance: f64,
}

/// Insertion-ordered map child id → [ParentEdge].
///
/// Inserting an existing child replaces its edge in place (last write wins)
/// without changing its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentMap {
    edges: Vec<(String, ParentEdge)>,
    index: HashMap<String, usize>,
}

impl ParentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, child: impl Into<String>, edge: ParentEdge) {
        let child = child.into();
        match self.index.get(&child) {
            Some(&pos) => self.edges[pos].1 = edge,
            None => {
                self.index.insert(child.clone(), self.edges.len());
                self.edges.push((child, edge));
            }
        }
    }

    pub fn get(&self, child: &str) -> Option<&ParentEdge> {
        self.index.get(child).map(|&pos| &self.edges[pos].1)
    }

    pub fn contains(&self, child: &str) -> bool {
        self.index.contains_key(child)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParentEdge)> {
        self.edges.iter().map(|(child, edge)| (child.as_str(), edge))
    }

    /// Renames `old` to `new` both as a child key and wherever it appears as a parent.
    fn rename(&mut self, old: &str, new: &str) {
        if let Some(pos) = self.index.remove(old) {
            self.edges[pos].0 = new.to_string();
            self.index.insert(new.to_string(), pos);
        }
        for (_, edge) in self.edges.iter_mut() {
            if edge.parent == old {
                edge.parent = new.to_string();
            }
        }
    }
}

/// Ordered sequence accumulator; residues for a repeated id are appended.
#[derive(Debug, Default)]
pub(crate) struct SequenceSet {
    sequences: Vec<Sequence>,
    index: HashMap<String, usize>,
}

impl SequenceSet {
    pub(crate) fn append(&mut self, id: &str, residues: &str) {
        match self.index.get(id) {
            Some(&pos) => self.sequences[pos].residues.push_str(residues),
            None => {
                self.index.insert(id.to_string(), self.sequences.len());
                self.sequences.push(Sequence::new(id, residues));
            }
        }
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Sequence> {
        self.index.get(id).map(|&pos| &self.sequences[pos])
    }

    pub(crate) fn into_vec(self) -> Vec<Sequence> {
        self.sequences
    }
}

/// Parsed content of one outfile: every sequence plus the parent of each non-root.
#[derive(Debug, Clone, Default)]
pub struct Outfile {
    pub sequences: Vec<Sequence>,
    pub parents: ParentMap,
}

impl Outfile {
    pub fn sequence(&self, id: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty() || self.parents.is_empty()
    }

    /// Recovers the full seed name from an identifier truncated to `width` characters.
    ///
    /// Exactly one sequence id of length `width` must be a substring of `seed`.
    pub fn expand_seed(&mut self, seed: &str, width: usize) -> Result<()> {
        let matches: Vec<usize> = self
            .sequences
            .iter()
            .enumerate()
            .filter(|(_, s)| s.id.chars().count() == width && seed.contains(s.id.as_str()))
            .map(|(pos, _)| pos)
            .collect();

        match matches.as_slice() {
            [] => Err(OutfileError::SeedNotFound {
                seed: seed.to_string(),
                width,
            }),
            [pos] => {
                let truncated = std::mem::replace(&mut self.sequences[*pos].id, seed.to_string());
                self.parents.rename(&truncated, seed);
                Ok(())
            }
            _ => Err(OutfileError::AmbiguousSeed {
                seed: seed.to_string(),
                matches: matches
                    .iter()
                    .map(|&pos| self.sequences[pos].id.clone())
                    .collect(),
            }),
        }
    }
}

/// Number of differing aligned positions between `a` and `b`.
///
/// Only the common prefix is compared; a length mismatch is logged.
pub fn hamming(a: &str, b: &str) -> usize {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a != len_b {
        warn!("comparing sequences of unequal length ({len_a} vs {len_b}); extra residues ignored");
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count()
}
