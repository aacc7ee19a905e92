//! EBB region selection (spec §4.1 "Region selection"): partition the
//! function into extended basic blocks, enumerate every simple path inside
//! each EBB, and rank all of them by static execution probability.

use clc_analyses::{ebb_paths, ControlFlowGraph, EbbPartition};
use clc_ir::{Block, Function};

pub struct RankedPath {
    pub blocks: Vec<Block>,
    pub probability: f64,
}

/// All EBB paths of `func`, sorted by decreasing probability (ties broken by
/// path order of discovery, for determinism).
pub fn select_paths(func: &Function, cfg: &ControlFlowGraph) -> Vec<RankedPath> {
    let partition = EbbPartition::compute(func, cfg);
    let mut ranked = Vec::new();

    for &b in func.block_order() {
        if !partition.is_header(b) {
            continue;
        }
        for path in ebb_paths(b, &partition, cfg) {
            let probability = path_probability(&path, cfg);
            ranked.push(RankedPath { blocks: path, probability });
        }
    }

    ranked.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap());
    ranked
}

fn path_probability(path: &[Block], cfg: &ControlFlowGraph) -> f64 {
    let mut p = 1.0;
    for i in 0..path.len().saturating_sub(1) {
        let fanout = cfg.succs(path[i]).len().max(1);
        p /= fanout as f64;
    }
    p
}
