//! Dominance and the dominator tree.
//!
//! Uses the Cooper/Harvey/Kennedy "A Simple, Fast Dominance Algorithm"
//! iterative-intersection approach, the textbook algorithm this teaching
//! compiler's course materials are built around; shaped after
//! `cranelift-codegen`'s `dominator_tree.rs` (reverse-postorder numbering,
//! lazily invalidated, one node per block).

use crate::cfg::ControlFlowGraph;
use clc_ir::{Block, Function};
use cranelift_entity::SecondaryMap;

pub struct DominatorTree {
    rpo: Vec<Block>,
    rpo_number: SecondaryMap<Block, Option<u32>>,
    idom: SecondaryMap<Block, Option<Block>>,
    entry: Block,
}

impl DominatorTree {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let entry = cfg.entry().or_else(|| func.entry()).expect("function has no entry block");
        let rpo = postorder(entry, cfg).into_iter().rev().collect::<Vec<_>>();

        let mut rpo_number: SecondaryMap<Block, Option<u32>> = SecondaryMap::new();
        for (i, &b) in rpo.iter().enumerate() {
            rpo_number[b] = Some(i as u32);
        }

        let mut idom: SecondaryMap<Block, Option<Block>> = SecondaryMap::new();
        idom[entry] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &b in rpo.iter().skip(1) {
                if rpo_number[b].is_none() {
                    continue; // unreachable block
                }
                let mut new_idom = None;
                for &p in cfg.preds(b) {
                    if idom[p].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(cur) => intersect(cur, p, &idom, &rpo_number),
                    });
                }
                if new_idom.is_some() && idom[b] != new_idom {
                    idom[b] = new_idom;
                    changed = true;
                }
            }
        }

        Self { rpo, rpo_number, idom, entry }
    }

    pub fn idom(&self, b: Block) -> Option<Block> {
        if b == self.entry {
            None
        } else {
            self.idom[b]
        }
    }

    pub fn is_reachable(&self, b: Block) -> bool {
        self.rpo_number[b].is_some()
    }

    /// `a` dominates `b` (every path from the entry to `b` passes through
    /// `a`); every block dominates itself.
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if a == b {
            return true;
        }
        if !self.is_reachable(b) {
            return false;
        }
        let mut cur = b;
        while let Some(next) = self.idom[cur] {
            if next == a {
                return true;
            }
            if next == cur {
                break;
            }
            cur = next;
        }
        false
    }

    pub fn rpo(&self) -> &[Block] {
        &self.rpo
    }
}

fn intersect(
    mut a: Block,
    mut b: Block,
    idom: &SecondaryMap<Block, Option<Block>>,
    rpo_number: &SecondaryMap<Block, Option<u32>>,
) -> Block {
    while a != b {
        while rpo_number[a] > rpo_number[b] {
            a = idom[a].expect("finger walk should reach a common idom");
        }
        while rpo_number[b] > rpo_number[a] {
            b = idom[b].expect("finger walk should reach a common idom");
        }
    }
    a
}

fn postorder(entry: Block, cfg: &ControlFlowGraph) -> Vec<Block> {
    let mut visited = rustc_hash::FxHashSet::default();
    let mut order = Vec::new();
    // Explicit stack: (block, next successor index to visit).
    let mut stack = vec![(entry, 0usize)];
    visited.insert(entry);
    while let Some(&mut (b, ref mut i)) = stack.last_mut() {
        let succs = cfg.succs(b);
        if *i < succs.len() {
            let s = succs[*i];
            *i += 1;
            if visited.insert(s) {
                stack.push((s, 0));
            }
        } else {
            order.push(b);
            stack.pop();
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::{ArgKind, InstKind, Instruction, IsaContext, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("br", InstKind::Branch, vec![ArgKind::BlockLabel]);
        isa.define("brz", InstKind::Branch, vec![ArgKind::RegUse, ArgKind::BlockLabel, ArgKind::BlockLabel]);
        isa.define("ret", InstKind::Return, vec![]);
        isa
    }

    #[test]
    fn diamond_dominance() {
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
        assert_eq!(dom.idom(b3), Some(b0));
        assert_eq!(dom.idom(b1), Some(b0));
        assert!(dom.dominates(b0, b3));
        assert!(!dom.dominates(b1, b3));
    }
}
