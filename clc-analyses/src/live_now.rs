//! Per-instruction liveness ("LiveNow"): the set of registers live
//! immediately after each instruction in a block, derived from block-level
//! [`Liveness`] by a backward scan starting from the block's `LiveOut` set
//! and undoing each instruction's defs/uses in reverse. This is the
//! per-instruction granularity the interference graph and spill-cost
//! estimate are built from.

use crate::liveness::Liveness;
use clc_ir::{Block, Function, IsaContext, UnknownOpcode};
use cranelift_entity::SecondaryMap;
use rustc_hash::FxHashSet;

pub struct LiveNow {
    /// `after[b][i]` is the set of registers live immediately after
    /// instruction `i` of block `b` (including the terminator).
    after: SecondaryMap<Block, Vec<FxHashSet<String>>>,
}

impl LiveNow {
    pub fn compute(func: &Function, isa: &IsaContext, live: &Liveness) -> Result<Self, UnknownOpcode> {
        let mut after: SecondaryMap<Block, Vec<FxHashSet<String>>> = SecondaryMap::new();

        for (b, data) in func.blocks() {
            let n = data.insts.len();
            let mut sets = vec![FxHashSet::default(); n];
            let mut live_after: FxHashSet<String> = live.live_out(b).clone();
            for i in (0..n).rev() {
                let inst = &data.insts[i];
                if inst.is_phi() {
                    // A phi's def is live only across the block boundary, not
                    // within the block body; its operands are edge-uses, not
                    // block-local uses, so the scan skips both.
                    sets[i] = live_after.clone();
                    continue;
                }
                sets[i] = live_after.clone();
                for d in inst.defs(isa)? {
                    live_after.remove(d);
                }
                for u in inst.uses(isa)? {
                    live_after.insert(u.to_string());
                }
            }
            after[b] = sets;
        }

        Ok(Self { after })
    }

    pub fn after(&self, b: Block, idx: usize) -> &FxHashSet<String> {
        &self.after[b][idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::ControlFlowGraph;
    use clc_ir::{ArgKind, InstKind, Instruction, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa
    }

    #[test]
    fn def_not_live_before_its_own_instruction() {
        let mut f = Function::new("f", vec!["a".into(), "b".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("a".into()), Token::Reg("b".into()), Token::Reg("t".into())],
        ));
        f.block_mut(b0).push(Instruction::new("ret", vec![Token::Reg("t".into())]));

        let isa = isa();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let live = Liveness::compute(&f, &isa, &cfg).unwrap();
        let now = LiveNow::compute(&f, &isa, &live).unwrap();
        assert!(now.after(b0, 0).contains("t"));
        assert!(!now.after(b0, 0).contains("a"));
    }
}
