use crate::error::{OutfileError, Result};
use crate::sequence::Sequence;
use crate::tree::Tree;
use flate2::Compression;
use flate2::write::GzEncoder;
use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Residues per FASTA line.
const FASTA_LINE_WIDTH: usize = 60;

/// Open `path` for writing, gzip-compressed if it ends with `.gz`.
fn create_writer(path: &Path) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "writing to stdout is not supported",
        ));
    }

    let file = File::create(path)?;
    if path.to_string_lossy().ends_with(".gz") {
        let enc = GzEncoder::new(file, Compression::default());
        Ok(Box::new(BufWriter::new(enc)))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn write_fasta_records<'a, W, I>(out: &mut W, sequences: I) -> io::Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a Sequence>,
{
    for seq in sequences {
        writeln!(out, ">{}", seq.id)?;
        let residues = seq.residues.as_bytes();
        if residues.is_empty() {
            writeln!(out)?;
        }
        for line in residues.chunks(FASTA_LINE_WIDTH) {
            out.write_all(line)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Write `sequences` as FASTA to `path` (`.gz` gets compressed).
pub fn write_fasta<'a, P, I>(path: P, sequences: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Sequence>,
{
    let p = path.as_ref();
    let mut out = create_writer(p).map_err(|e| OutfileError::io(p, e))?;
    write_fasta_records(&mut out, sequences)
        .and_then(|_| out.flush())
        .map_err(|e| OutfileError::io(p, e))
}

/// Convert to a [phylotree] tree, keeping every node name and branch length.
pub fn to_phylotree(tree: &Tree) -> Result<PhyloTree> {
    let mut phylo = PhyloTree::new();
    let root = phylo.add(PhyloNode::new_named(&tree.root_node().name));

    let mut stack = vec![(tree.root(), root)];
    while let Some((id, phylo_id)) = stack.pop() {
        for &child in tree[id].children() {
            let node = &tree[child];
            let child_id = phylo
                .add_child(PhyloNode::new_named(&node.name), phylo_id, Some(node.dist))
                .map_err(|e| OutfileError::Newick(e.to_string()))?;
            stack.push((child, child_id));
        }
    }
    Ok(phylo)
}

/// Newick string of `tree`, internal and root names included.
pub fn to_newick(tree: &Tree) -> Result<String> {
    to_phylotree(tree)?
        .to_newick()
        .map_err(|e| OutfileError::Newick(e.to_string()))
}

/// Write `tree` in Newick format to `path` (`.gz` gets compressed).
pub fn write_newick<P: AsRef<Path>>(path: P, tree: &Tree) -> Result<()> {
    let p = path.as_ref();
    let newick = to_newick(tree)?;
    let mut out = create_writer(p).map_err(|e| OutfileError::io(p, e))?;
    writeln!(&mut out, "{newick}")
        .and_then(|_| out.flush())
        .map_err(|e| OutfileError::io(p, e))
}
