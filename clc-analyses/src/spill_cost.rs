//! Spill cost estimate: how expensive it would be to keep a register in a
//! spill slot rather than a physical register, as the weighted count of its
//! defs and uses. Each occurrence costs one memory access, scaled by the
//! executing block's estimated frequency so that occurrences inside loops
//! are penalized.

use crate::block_freq::BlockFrequency;
use clc_ir::{Function, IsaContext, UnknownOpcode};
use rustc_hash::FxHashMap;

pub struct SpillCost {
    cost: FxHashMap<String, f64>,
}

impl SpillCost {
    pub fn compute(func: &Function, isa: &IsaContext, freq: &BlockFrequency) -> Result<Self, UnknownOpcode> {
        let mut cost: FxHashMap<String, f64> = FxHashMap::default();
        for (b, data) in func.blocks() {
            let w = freq.of(b);
            for inst in &data.insts {
                if inst.is_phi() {
                    if let Some(d) = inst.phi_def() {
                        *cost.entry(d.to_string()).or_default() += w;
                    }
                    continue;
                }
                for d in inst.defs(isa)? {
                    *cost.entry(d.to_string()).or_default() += w;
                }
                for u in inst.uses(isa)? {
                    *cost.entry(u.to_string()).or_default() += w;
                }
            }
        }
        Ok(Self { cost })
    }

    /// Zero for a register that is never referenced (shouldn't happen for a
    /// live range actually present in the function, but kept total).
    pub fn of(&self, reg: &str) -> f64 {
        self.cost.get(reg).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::ControlFlowGraph;
    use crate::dominance::DominatorTree;
    use clc_ir::{ArgKind, InstKind, Instruction, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("brnz", InstKind::Branch, vec![ArgKind::RegUse, ArgKind::BlockLabel, ArgKind::BlockLabel]);
        isa.define("br", InstKind::Branch, vec![ArgKind::BlockLabel]);
        isa.define("ret", InstKind::Return, vec![]);
        isa
    }

    #[test]
    fn uses_inside_a_loop_cost_more() {
        let mut f = Function::new("f", vec!["x".into(), "c".into()]);
        let entry = f.push_block("entry");
        let head = f.push_block("head");
        let body = f.push_block("body");
        let exit = f.push_block("exit");
        f.block_mut(entry).push(Instruction::new("br", vec![Token::Label("head".into())]));
        f.block_mut(head).push(Instruction::new(
            "brnz",
            vec![Token::Reg("c".into()), Token::Label("body".into()), Token::Label("exit".into())],
        ));
        f.block_mut(body).push(Instruction::new(
            "add",
            vec![Token::Reg("x".into()), Token::Reg("x".into()), Token::Reg("x".into())],
        ));
        f.block_mut(body).push(Instruction::new("br", vec![Token::Label("head".into())]));
        f.block_mut(exit).push(Instruction::new("ret", vec![]));

        let isa = isa();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let dom = DominatorTree::compute(&f, &cfg);
        let freq = BlockFrequency::compute(&f, &cfg, &dom);
        let spill = SpillCost::compute(&f, &isa, &freq).unwrap();
        assert_eq!(spill.of("x"), 20.0); // 2 occurrences * frequency 10
    }
}
