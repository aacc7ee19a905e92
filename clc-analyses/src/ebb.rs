//! Extended basic blocks: maximal single-entry trees of blocks, and
//! enumeration of their root-to-leaf paths. A block starts a new EBB iff it
//! is the function entry or has more than one predecessor; every other
//! block belongs to the EBB of its unique predecessor.

use crate::cfg::ControlFlowGraph;
use clc_ir::{Block, Function};
use cranelift_entity::SecondaryMap;

/// Maps every reachable block to the header of the EBB it belongs to.
pub struct EbbPartition {
    header: SecondaryMap<Block, Option<Block>>,
    members: SecondaryMap<Block, Vec<Block>>,
}

impl EbbPartition {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut header: SecondaryMap<Block, Option<Block>> = SecondaryMap::new();
        let mut members: SecondaryMap<Block, Vec<Block>> = SecondaryMap::new();

        for &b in func.block_order() {
            let is_header = Some(b) == cfg.entry() || cfg.pred_count(b) != 1;
            if is_header {
                header[b] = Some(b);
                members[b].push(b);
            }
        }
        // Blocks are visited in layout order, which for a well-formed
        // program places a block's unique predecessor earlier in the list
        // whenever that predecessor is the sole reason it isn't a header.
        for &b in func.block_order() {
            if header[b].is_some() {
                continue;
            }
            let pred = cfg.preds(b)[0];
            let h = header[pred].unwrap_or(pred);
            header[b] = Some(h);
            members[h].push(b);
        }

        Self { header, members }
    }

    pub fn header_of(&self, b: Block) -> Block {
        self.header[b].unwrap_or(b)
    }

    pub fn is_header(&self, b: Block) -> bool {
        self.header[b] == Some(b)
    }

    /// All blocks belonging to the EBB rooted at `header`, in discovery
    /// order (header first).
    pub fn members(&self, header: Block) -> &[Block] {
        &self.members[header]
    }
}

/// Enumerates every root-to-leaf path through the EBB rooted at `header`. A
/// path ends when the current block has no successor still inside the EBB.
pub fn paths(header: Block, partition: &EbbPartition, cfg: &ControlFlowGraph) -> Vec<Vec<Block>> {
    let mut out = Vec::new();
    let mut prefix = vec![header];
    walk(header, header, partition, cfg, &mut prefix, &mut out);
    out
}

fn walk(
    ebb_header: Block,
    at: Block,
    partition: &EbbPartition,
    cfg: &ControlFlowGraph,
    prefix: &mut Vec<Block>,
    out: &mut Vec<Vec<Block>>,
) {
    let in_ebb: Vec<Block> = cfg
        .succs(at)
        .iter()
        .copied()
        .filter(|&s| !partition.is_header(s) && partition.header_of(s) == ebb_header)
        .collect();

    if in_ebb.is_empty() {
        out.push(prefix.clone());
        return;
    }
    for s in in_ebb {
        prefix.push(s);
        walk(ebb_header, s, partition, cfg, prefix, out);
        prefix.pop();
    }
}
