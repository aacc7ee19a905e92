//! Block-level liveness: `LiveIn`/`LiveOut` register sets, computed as the
//! standard backward fixpoint over the flow graph (`LiveOut(b) = union of
//! LiveIn(s)` for every successor `s`; `LiveIn(b) = uses(b) | (LiveOut(b) -
//! defs(b))`), iterated until no block's sets change.

use crate::cfg::ControlFlowGraph;
use clc_ir::{Block, Function, IsaContext, UnknownOpcode};
use cranelift_entity::SecondaryMap;
use rustc_hash::FxHashSet;

pub struct Liveness {
    live_in: SecondaryMap<Block, FxHashSet<String>>,
    live_out: SecondaryMap<Block, FxHashSet<String>>,
}

impl Liveness {
    pub fn compute(func: &Function, isa: &IsaContext, cfg: &ControlFlowGraph) -> Result<Self, UnknownOpcode> {
        let mut upward_exposed: SecondaryMap<Block, FxHashSet<String>> = SecondaryMap::new();
        let mut all_defs: SecondaryMap<Block, FxHashSet<String>> = SecondaryMap::new();
        // (predecessor label -> registers a successor's phis read from it)
        let mut phi_uses_from: SecondaryMap<Block, SecondaryMap<Block, FxHashSet<String>>> =
            SecondaryMap::new();

        for (b, data) in func.blocks() {
            let mut defined_so_far: FxHashSet<String> = FxHashSet::default();
            for inst in &data.insts {
                if inst.is_phi() {
                    if let Some(d) = inst.phi_def() {
                        all_defs[b].insert(d.to_string());
                        defined_so_far.insert(d.to_string());
                    }
                    if let Some(operands) = inst.phi_operands() {
                        for (pred_name, reg) in operands {
                            if let Some(pred) = func.block_by_name(pred_name) {
                                phi_uses_from[pred][b].insert(reg.to_string());
                            }
                        }
                    }
                    continue;
                }
                for u in inst.uses(isa)? {
                    if !defined_so_far.contains(u) {
                        upward_exposed[b].insert(u.to_string());
                    }
                }
                for d in inst.defs(isa)? {
                    defined_so_far.insert(d.to_string());
                    all_defs[b].insert(d.to_string());
                }
            }
        }

        let mut live_in: SecondaryMap<Block, FxHashSet<String>> = SecondaryMap::new();
        let mut live_out: SecondaryMap<Block, FxHashSet<String>> = SecondaryMap::new();

        let order: Vec<Block> = func.block_order().to_vec();
        let mut changed = true;
        while changed {
            changed = false;
            for &b in order.iter().rev() {
                let mut out = FxHashSet::default();
                for &s in cfg.succs(b) {
                    out.extend(phi_uses_from[b][s].iter().cloned());
                    out.extend(live_in[s].iter().cloned());
                }
                if out != live_out[b] {
                    live_out[b] = out;
                    changed = true;
                }

                let mut inn = upward_exposed[b].clone();
                for r in live_out[b].iter() {
                    if !all_defs[b].contains(r) {
                        inn.insert(r.clone());
                    }
                }
                if inn != live_in[b] {
                    live_in[b] = inn;
                    changed = true;
                }
            }
        }

        Ok(Self { live_in, live_out })
    }

    pub fn live_in(&self, b: Block) -> &FxHashSet<String> {
        &self.live_in[b]
    }

    pub fn live_out(&self, b: Block) -> &FxHashSet<String> {
        &self.live_out[b]
    }
}
