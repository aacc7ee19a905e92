//! Dominance frontier: `DF(b)` is the set of blocks `s` such that `b`
//! dominates a predecessor of `s` but does not strictly dominate `s`
//! itself. Computed by walking every block `b` with at least two
//! predecessors and, for each predecessor `p`, climbing `p`'s dominator-tree
//! ancestry up to (but not including) `idom(b)`, adding `b` to each
//! ancestor's frontier along the way.

use crate::cfg::ControlFlowGraph;
use crate::dominance::DominatorTree;
use clc_ir::Block;
use cranelift_entity::SecondaryMap;

pub struct DominanceFrontier {
    df: SecondaryMap<Block, Vec<Block>>,
}

impl DominanceFrontier {
    pub fn compute(cfg: &ControlFlowGraph, dom: &DominatorTree) -> Self {
        let mut df: SecondaryMap<Block, Vec<Block>> = SecondaryMap::new();
        for &b in dom.rpo() {
            if cfg.pred_count(b) < 2 {
                continue;
            }
            for &p in cfg.preds(b) {
                let mut runner = p;
                while dom.idom(b) != Some(runner) && runner != b {
                    if !df[runner].contains(&b) {
                        df[runner].push(b);
                    }
                    match dom.idom(runner) {
                        Some(next) if next != runner => runner = next,
                        _ => break,
                    }
                }
            }
        }
        Self { df }
    }

    pub fn of(&self, b: Block) -> &[Block] {
        &self.df[b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::{ArgKind, Function, InstKind, Instruction, IsaContext, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("br", InstKind::Branch, vec![ArgKind::BlockLabel]);
        isa.define("brz", InstKind::Branch, vec![ArgKind::RegUse, ArgKind::BlockLabel, ArgKind::BlockLabel]);
        isa.define("ret", InstKind::Return, vec![]);
        isa
    }

    #[test]
    fn diamond_frontier_is_join_block() {
        let mut f = Function::new("f", vec!["c".into()]);
        let b0 = f.push_block("b0");
        let b1 = f.push_block("b1");
        let b2 = f.push_block("b2");
        let b3 = f.push_block("b3");
        f.block_mut(b0).push(Instruction::new(
            "brz",
            vec![Token::Reg("c".into()), Token::Label("b1".into()), Token::Label("b2".into())],
        ));
        f.block_mut(b1).push(Instruction::new("br", vec![Token::Label("b3".into())]));
        f.block_mut(b2).push(Instruction::new("br", vec![Token::Label("b3".into())]));
        f.block_mut(b3).push(Instruction::new("ret", vec![]));

        let cfg = ControlFlowGraph::compute(&f, &isa()).unwrap();
        let dom = DominatorTree::compute(&f, &cfg);
        let df = DominanceFrontier::compute(&cfg, &dom);
        assert_eq!(df.of(b1), &[b3]);
        assert_eq!(df.of(b2), &[b3]);
        assert!(df.of(b0).is_empty());
    }
}
