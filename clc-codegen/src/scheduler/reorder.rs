//! Code reordering and cross-block compensation (spec §4.1 "Code
//! reordering and compensation"): walk the computed start-cycle map in
//! ascending order, rebuilding each region block's instruction list;
//! migrating an instruction into a later path block leaves a copy on every
//! CFG successor that isn't the next path block.

use super::depgraph::DepGraph;
use clc_analyses::ControlFlowGraph;
use clc_ir::{Block, Function, Instruction};
use rustc_hash::FxHashMap;

/// Rebuilds `region[freeze_upto..]` from the computed schedule. Blocks
/// `region[..freeze_upto]` are an already-committed shared prefix (from an
/// earlier, higher-probability path) and are left untouched — this is the
/// prefix-reuse the EBB scheduler performs when two paths fork after a
/// common head (spec §4.1 step 3 / `SPEC_FULL.md` §C.1).
pub fn reorder_with_compensation(
    func: &mut Function,
    cfg: &ControlFlowGraph,
    region: &[Block],
    graph: &DepGraph,
    start: &[u32],
    freeze_upto: usize,
) {
    let mut order: Vec<usize> = (0..graph.nodes.len())
        .filter(|&n| graph.region_index[n] >= freeze_upto)
        .collect();
    order.sort_by_key(|&n| (start[n], n));

    let mut outputs: Vec<Vec<Instruction>> = region[freeze_upto..].iter().map(|_| Vec::new()).collect();
    let mut compensation: FxHashMap<Block, Vec<Instruction>> = FxHashMap::default();
    let mut current = freeze_upto;

    for node in order {
        let inst = graph.instruction(node).clone();
        let orig = graph.region_index[node];
        let is_terminator = node == graph.block_terminal[orig];

        if orig < current {
            outputs[current - freeze_upto].push(inst.clone());
            let orig_block = region[orig];
            let next_path_block = region.get(orig + 1).copied();
            for &succ in cfg.succs(orig_block) {
                if Some(succ) != next_path_block {
                    compensation.entry(succ).or_default().push(inst.clone());
                }
            }
        } else {
            outputs[current - freeze_upto].push(inst);
        }

        if is_terminator && orig == current && current + 1 < region.len() {
            current += 1;
        }
    }

    for (i, &b) in region[freeze_upto..].iter().enumerate() {
        func.block_mut(b).insts = std::mem::take(&mut outputs[i]);
    }
    for (b, comp) in compensation {
        let mut merged = comp;
        merged.extend(func.block(b).insts.iter().cloned());
        func.block_mut(b).insts = merged;
    }
}
