//! Static block-execution-frequency estimate, used to rank EBB paths by how
//! much scheduling effort they deserve. Loops are found as back edges (a
//! successor that dominates its predecessor) via a DFS of the dominator
//! tree, and each loop nesting level multiplies a block's frequency by 10,
//! relative to an entry frequency of 1.0.

use crate::cfg::ControlFlowGraph;
use crate::dominance::DominatorTree;
use clc_ir::{Block, Function};
use cranelift_entity::SecondaryMap;

pub struct BlockFrequency {
    freq: SecondaryMap<Block, f64>,
}

impl BlockFrequency {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph, dom: &DominatorTree) -> Self {
        let mut loop_headers = Vec::new();
        for &b in func.block_order() {
            if !dom.is_reachable(b) {
                continue;
            }
            for &s in cfg.succs(b) {
                if dom.dominates(s, b) && !loop_headers.contains(&s) {
                    loop_headers.push(s);
                }
            }
        }

        let mut freq: SecondaryMap<Block, f64> = SecondaryMap::new();
        for &b in func.block_order() {
            let depth = loop_headers.iter().filter(|&&h| dom.dominates(h, b)).count();
            freq[b] = 10f64.powi(depth as i32);
        }

        Self { freq }
    }

    pub fn of(&self, b: Block) -> f64 {
        self.freq[b]
    }
}
