//! The control-flow graph: one node per block, edge `b -> s` iff the
//! terminator of `b` may transfer control to `s` (spec §3).
//!
//! Modeled on `cranelift-codegen`'s `flowgraph.rs`: predecessors and
//! successors are stored per-block rather than as a global edge list.

use clc_ir::{Block, Function, IsaContext, UnknownOpcode};
use cranelift_entity::SecondaryMap;

#[derive(Clone, Default)]
struct CfgNode {
    preds: Vec<Block>,
    succs: Vec<Block>,
}

/// The directed graph of blocks, with the entry block distinguished.
#[derive(Clone)]
pub struct ControlFlowGraph {
    nodes: SecondaryMap<Block, CfgNode>,
    entry: Option<Block>,
}

impl ControlFlowGraph {
    pub fn compute(func: &Function, isa: &IsaContext) -> Result<Self, UnknownOpcode> {
        let mut nodes: SecondaryMap<Block, CfgNode> = SecondaryMap::new();
        for (b, data) in func.blocks() {
            if let Some(term) = data.terminator() {
                for target in term.branch_targets(isa)? {
                    if let Some(t) = func.block_by_name(target) {
                        nodes[b].succs.push(t);
                        nodes[t].preds.push(b);
                    }
                }
            }
        }
        Ok(Self { nodes, entry: func.entry() })
    }

    pub fn entry(&self) -> Option<Block> {
        self.entry
    }

    pub fn succs(&self, b: Block) -> &[Block] {
        &self.nodes[b].succs
    }

    pub fn preds(&self, b: Block) -> &[Block] {
        &self.nodes[b].preds
    }

    pub fn pred_count(&self, b: Block) -> usize {
        self.nodes[b].preds.len()
    }
}
