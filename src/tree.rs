//! Rooted multi-way tree over the sequences of an outfile.
//!
//! # Structure
//! The tree uses the arena pattern: all nodes live in one vector and refer to
//! each other by [NodeId]. Each node stores the index of its parent and the
//! ordered indices of its children, so walking up a lineage and walking down
//! the tree are both plain index lookups without shared ownership.
//!
//! ```text
//!         2            root: no parent, distance 0
//!       /   \
//!  >naive2   1
//!           / \
//!       seed   leafB
//! ```
//!
//! # Lookup
//! Nodes are found by regular-expression *search* on their names in level
//! order. Lookups are best effort: no match or several matches are logged as
//! warnings, never returned as errors.

use crate::error::{OutfileError, Result};
use crate::sequence::{ParentMap, Sequence};
use itertools::Itertools;
use log::warn;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::ops::Index;

/// Index of a node in a [Tree] (arena).
pub type NodeId = usize;

/// Cosmetic node annotation used when rendering a highlighted lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStyle {
    pub fgcolor: String,
    pub size: u32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        NodeStyle {
            fgcolor: "red".to_string(),
            size: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    index: NodeId,
    pub name: String,
    pub sequence: Sequence,
    /// Distance to the parent; 0 for the root.
    pub dist: f64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    style: Option<NodeStyle>,
}

impl Node {
    fn new(index: NodeId, sequence: Sequence, dist: f64) -> Self {
        Node {
            index,
            name: sequence.id.clone(),
            sequence,
            dist,
            parent: None,
            children: Vec::new(),
            style: None,
        }
    }

    pub fn index(&self) -> NodeId {
        self.index
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn style(&self) -> Option<&NodeStyle> {
        self.style.as_ref()
    }
}

// =#========================================================================#=
// TREE
// =#========================================================================#=
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Assembles the tree described by `sequences` and their `parents`.
///
/// Every sequence becomes a node; children are attached in sequence order.
///
/// # Errors
/// - [OutfileError::UnknownParent] if an edge names a parent that is not a sequence
/// - [OutfileError::RootCount] unless exactly one sequence has no parent
/// - [OutfileError::Disconnected] if some node cannot be reached from the root
pub fn build_tree(sequences: &[Sequence], parents: &ParentMap) -> Result<Tree> {
    let mut nodes: Vec<Node> = sequences
        .iter()
        .enumerate()
        .map(|(index, seq)| {
            let dist = parents.get(&seq.id).map_or(0.0, |edge| edge.distance);
            Node::new(index, seq.clone(), dist)
        })
        .collect();
    let by_name: HashMap<&str, NodeId> = sequences
        .iter()
        .enumerate()
        .map(|(index, seq)| (seq.id.as_str(), index))
        .collect();

    let mut orphans = Vec::new();
    for (index, seq) in sequences.iter().enumerate() {
        match parents.get(&seq.id) {
            Some(edge) => {
                let Some(&parent) = by_name.get(edge.parent.as_str()) else {
                    return Err(OutfileError::UnknownParent {
                        child: seq.id.clone(),
                        parent: edge.parent.clone(),
                    });
                };
                nodes[parent].children.push(index);
                nodes[index].parent = Some(parent);
            }
            None => orphans.push(index),
        }
    }

    let root = match orphans.as_slice() {
        [root] => *root,
        _ => return Err(OutfileError::RootCount(orphans.len())),
    };

    let tree = Tree { nodes, root };
    let reachable = tree.traverse().len();
    if reachable != tree.len() {
        return Err(OutfileError::Disconnected {
            reachable,
            total: tree.len(),
        });
    }
    Ok(tree)
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Number of nodes, ancestral ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Node ids in level order from the root, children in insertion order.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.nodes[id].children.iter().copied());
        }
        order
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.traverse()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// Looks up the first node, in level order, whose name matches `pattern`.
    ///
    /// Zero matches yield `None` and several matches pick the first; both cases
    /// emit a warning. Only an invalid pattern is an error.
    pub fn find_node(&self, pattern: &str) -> Result<Option<NodeId>> {
        let regex = Regex::new(pattern)?;
        let matches: Vec<NodeId> = self
            .traverse()
            .into_iter()
            .filter(|&id| regex.is_match(&self.nodes[id].name))
            .collect();

        match matches.as_slice() {
            [] => {
                warn!("Cannot find matching node; looking for name matching '{pattern}'");
                Ok(None)
            }
            [only] => Ok(Some(*only)),
            [first, ..] => {
                warn!(
                    "multiple nodes found; using first one. found: {}",
                    matches.iter().map(|&id| &self.nodes[id].name).join(", ")
                );
                Ok(Some(*first))
            }
        }
    }

    /// Iterates from `id` up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> Lineage<'_> {
        Lineage {
            tree: self,
            next: Some(id),
        }
    }

    /// Iterates from the node matching `pattern` up to the root.
    ///
    /// A pattern without match yields an empty lineage.
    pub fn lineage(&self, pattern: &str) -> Result<Lineage<'_>> {
        Ok(Lineage {
            tree: self,
            next: self.find_node(pattern)?,
        })
    }
}

// ============================================================================
// Modification (pub)
// ============================================================================
impl Tree {
    /// Pivots the root onto the node matching `pattern`.
    ///
    /// The target is detached from its parent and the old root becomes its
    /// child, inheriting the target's incoming distance. Nothing changes when
    /// the target is already the root or no node matches.
    pub fn reroot(&mut self, pattern: &str) -> Result<()> {
        let Some(target) = self.find_node(pattern)? else {
            return Ok(());
        };
        if target == self.root {
            return Ok(());
        }
        let old_root = self.root;

        if let Some(parent) = self.nodes[target].parent.take() {
            self.nodes[parent].children.retain(|&child| child != target);
        }
        self.nodes[target].children.push(old_root);
        self.nodes[old_root].parent = Some(target);
        self.nodes[old_root].dist = self.nodes[target].dist;
        self.nodes[target].dist = 0.0;
        self.root = target;
        Ok(())
    }

    /// Marks every node on the lineage from the node matching `pattern` to the root.
    ///
    /// Returns the number of highlighted nodes.
    pub fn highlight_lineage(&mut self, pattern: &str) -> Result<usize> {
        let lineage: Vec<NodeId> = self.lineage(pattern)?.map(Node::index).collect();
        for &id in &lineage {
            self.nodes[id].style = Some(NodeStyle::default());
        }
        Ok(lineage.len())
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

// =#========================================================================#=
// LINEAGE
// =#========================================================================#=
/// Iterator following parent links up to the root.
pub struct Lineage<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.tree.nodes[self.next?];
        self.next = node.parent;
        Some(node)
    }
}
