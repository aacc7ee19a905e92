//! Allocator-specific spill cost (spec §4.3 "Spill cost"): unlike
//! `clc_analyses::SpillCost`'s uniform per-occurrence weighting, the
//! allocator distinguishes the cost of reloading a value (one load) from the
//! cost of storing it back (one store), and marks live ranges that can never
//! be spilled usefully with an infinite cost. `clc_analyses::SpillCost`
//! intentionally keeps the simpler uniform model for its own, unrelated
//! reporting use.

use clc_analyses::{BlockFrequency, InterferenceGraph};
use clc_ir::{Function, IsaContext, UnknownOpcode};
use rustc_hash::FxHashMap;

/// Estimated cycles a load costs, relative to a store (spec §4.3: "loads
/// cost 3, stores cost 4").
const LOAD_COST: f64 = 3.0;
const STORE_COST: f64 = 4.0;

pub struct SpillCost {
    cost: FxHashMap<String, f64>,
}

impl SpillCost {
    pub fn compute(
        func: &Function,
        isa: &IsaContext,
        freq: &BlockFrequency,
        interference: &InterferenceGraph,
    ) -> Result<Self, UnknownOpcode> {
        let mut cost: FxHashMap<String, f64> = FxHashMap::default();
        for (b, data) in func.blocks() {
            let w = freq.of(b);
            for inst in &data.insts {
                if inst.is_phi() {
                    if let Some(d) = inst.phi_def() {
                        cost.entry(d.to_string()).or_insert(0.0);
                    }
                    continue;
                }
                for d in inst.defs(isa)? {
                    *cost.entry(d.to_string()).or_default() += w * STORE_COST;
                }
                for u in inst.uses(isa)? {
                    *cost.entry(u.to_string()).or_default() += w * LOAD_COST;
                }
            }
        }

        // A live range with no interference edges has nothing to gain from
        // spilling: freeing it can never unblock a coloring, so it is
        // treated as unspillable.
        for reg in cost.keys().cloned().collect::<Vec<_>>() {
            if interference.degree(&reg) == 0 {
                cost.insert(reg, f64::INFINITY);
            }
        }

        Ok(Self { cost })
    }

    pub fn of(&self, reg: &str) -> f64 {
        self.cost.get(reg).copied().unwrap_or(0.0)
    }

    pub fn is_unspillable(&self, reg: &str) -> bool {
        self.of(reg).is_infinite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_analyses::{ControlFlowGraph, DominatorTree, LiveNow, Liveness};
    use clc_ir::{ArgKind, InstKind, Instruction, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa
    }

    #[test]
    fn loads_and_stores_are_weighted_differently() {
        let mut f = Function::new("f", vec!["a".into(), "b".into(), "c".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("a".into()), Token::Reg("b".into()), Token::Reg("t1".into())],
        ));
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("t1".into()), Token::Reg("c".into()), Token::Reg("t2".into())],
        ));
        f.block_mut(b0).push(Instruction::new("ret", vec![Token::Reg("t2".into())]));

        let isa = isa();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let dom = DominatorTree::compute(&f, &cfg);
        let freq = BlockFrequency::compute(&f, &cfg, &dom);
        let live = Liveness::compute(&f, &isa, &cfg).unwrap();
        let live_now = LiveNow::compute(&f, &isa, &live).unwrap();
        let ig = InterferenceGraph::compute(&f, &isa, &live, &live_now).unwrap();
        let spill = SpillCost::compute(&f, &isa, &freq, &ig).unwrap();

        // t1: one store (its def) + one load (its use in the second add).
        assert_eq!(spill.of("t1"), STORE_COST + LOAD_COST);
        // a: no interference edges at all (it dies before anything it could
        // conflict with is born) -- unspillable.
        assert!(spill.is_unspillable("a"));
    }
}
