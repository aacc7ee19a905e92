//! Interference-graph coloring, both variants named in spec §4.3: Bottom-Up
//! (simplify-then-select, pushing low-degree nodes onto a stack and
//! assigning colors on the way back off it) and Top-Down (constrained nodes
//! assigned first, ordered by ascending spill cost). Neither variant
//! mutates the interference graph; Bottom-Up's "remove a node" step is
//! simulated by tracking which nodes are still `remaining` when computing a
//! node's current degree.

use super::spill_cost::SpillCost;
use clc_analyses::InterferenceGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Variant {
    BottomUp,
    TopDown,
}

/// Either a complete coloring, or the one live range that coloring could not
/// find a color for (spill it and restart, per spec §4.3).
pub enum ColorOutcome {
    Colored(FxHashMap<String, usize>),
    Spill(String),
}

pub fn color(variant: Variant, ig: &InterferenceGraph, spill: &SpillCost, k: usize, registers: &[String]) -> ColorOutcome {
    match variant {
        Variant::BottomUp => bottom_up(ig, spill, k, registers),
        Variant::TopDown => top_down(ig, spill, k, registers),
    }
}

fn bottom_up(ig: &InterferenceGraph, spill: &SpillCost, k: usize, registers: &[String]) -> ColorOutcome {
    let mut remaining: FxHashSet<&str> = registers.iter().map(String::as_str).collect();
    let mut stack: Vec<&str> = Vec::with_capacity(registers.len());

    while !remaining.is_empty() {
        let pick = remaining
            .iter()
            .copied()
            .find(|&r| ig.neighbors(r).filter(|n| remaining.contains(n)).count() < k)
            .or_else(|| {
                remaining
                    .iter()
                    .copied()
                    .min_by(|a, b| spill.of(a).partial_cmp(&spill.of(b)).unwrap_or(Ordering::Equal))
            })
            .expect("remaining is non-empty");
        stack.push(pick);
        remaining.remove(pick);
    }

    let mut colors: FxHashMap<String, usize> = FxHashMap::default();
    while let Some(r) = stack.pop() {
        let used: FxHashSet<usize> = ig.neighbors(r).filter_map(|n| colors.get(n).copied()).collect();
        match (0..k).find(|c| !used.contains(c)) {
            Some(c) => {
                colors.insert(r.to_string(), c);
            }
            None => return ColorOutcome::Spill(r.to_string()),
        }
    }
    ColorOutcome::Colored(colors)
}

fn top_down(ig: &InterferenceGraph, spill: &SpillCost, k: usize, registers: &[String]) -> ColorOutcome {
    let (mut constrained, unconstrained): (Vec<&str>, Vec<&str>) =
        registers.iter().map(String::as_str).partition(|&r| ig.degree(r) >= k);

    constrained.sort_by(|a, b| match (spill.of(a).is_infinite(), spill.of(b).is_infinite()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => spill.of(a).partial_cmp(&spill.of(b)).unwrap_or(Ordering::Equal),
    });

    let mut colors: FxHashMap<String, usize> = FxHashMap::default();
    for r in constrained.into_iter().chain(unconstrained) {
        let used: FxHashSet<usize> = ig.neighbors(r).filter_map(|n| colors.get(n).copied()).collect();
        match (0..k).find(|c| !used.contains(c)) {
            Some(c) => {
                colors.insert(r.to_string(), c);
            }
            None => return ColorOutcome::Spill(r.to_string()),
        }
    }
    ColorOutcome::Colored(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_analyses::{ControlFlowGraph, LiveNow, Liveness};
    use clc_ir::{ArgKind, InstKind, Function, Instruction, IsaContext, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa
    }

    fn triangle_graph() -> (Function, IsaContext) {
        // a, b, c pairwise interfere: t = a+b; u = t+c; ret u
        let isa = isa();
        let mut f = Function::new("f", vec!["a".into(), "b".into(), "c".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("a".into()), Token::Reg("b".into()), Token::Reg("t".into())],
        ));
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("t".into()), Token::Reg("c".into()), Token::Reg("u".into())],
        ));
        f.block_mut(b0).push(Instruction::new("ret", vec![Token::Reg("u".into())]));
        (f, isa)
    }

    #[test]
    fn two_colors_suffice_when_only_one_pair_interferes() {
        let (f, isa) = triangle_graph();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let dom = clc_analyses::DominatorTree::compute(&f, &cfg);
        let freq = clc_analyses::BlockFrequency::compute(&f, &cfg, &dom);
        let live = Liveness::compute(&f, &isa, &cfg).unwrap();
        let live_now = LiveNow::compute(&f, &isa, &live).unwrap();
        let ig = InterferenceGraph::compute(&f, &isa, &live, &live_now).unwrap();
        let spill = SpillCost::compute(&f, &isa, &freq, &ig).unwrap();
        let regs: Vec<String> = ["a", "b", "c", "t", "u"].iter().map(|s| s.to_string()).collect();

        // only (t, c) actually interfere at the "u" def point.
        let bu = match color(Variant::BottomUp, &ig, &spill, 2, &regs) {
            ColorOutcome::Colored(c) => c,
            ColorOutcome::Spill(_) => panic!("expected a successful coloring"),
        };
        assert_ne!(bu["t"], bu["c"]);

        let td = match color(Variant::TopDown, &ig, &spill, 2, &regs) {
            ColorOutcome::Colored(c) => c,
            ColorOutcome::Spill(_) => panic!("expected a successful coloring"),
        };
        assert_ne!(td["t"], td["c"]);
    }

    // spec §8 scenario S3: a three-node chain (t interferes with both a and
    // c, a and c don't interfere with each other) colors with k=2 and no
    // spilling, same shape as `triangle_graph` but read through the
    // top-down partition instead of bottom-up simplification.
    #[test]
    fn s3_top_down_k2_colors_the_chain_without_spilling() {
        let (f, isa) = triangle_graph();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let dom = clc_analyses::DominatorTree::compute(&f, &cfg);
        let freq = clc_analyses::BlockFrequency::compute(&f, &cfg, &dom);
        let live = Liveness::compute(&f, &isa, &cfg).unwrap();
        let live_now = LiveNow::compute(&f, &isa, &live).unwrap();
        let ig = InterferenceGraph::compute(&f, &isa, &live, &live_now).unwrap();
        let spill = SpillCost::compute(&f, &isa, &freq, &ig).unwrap();
        let regs: Vec<String> = ["a", "b", "c", "t", "u"].iter().map(|s| s.to_string()).collect();

        let colors = match color(Variant::TopDown, &ig, &spill, 2, &regs) {
            ColorOutcome::Colored(c) => c,
            ColorOutcome::Spill(victim) => panic!("expected a successful coloring, got a spill of {victim}"),
        };
        assert_ne!(colors["t"], colors["c"]);
        for c in colors.values() {
            assert!(*c < 2);
        }
    }

    // spec §8 scenario S4: the same chain with k=1 — t interferes with c, so
    // one color cannot cover both, and coloring must report a spill rather
    // than silently reusing a color.
    #[test]
    fn s4_top_down_k1_forces_a_spill_of_the_interfering_pair() {
        let (f, isa) = triangle_graph();
        let cfg = ControlFlowGraph::compute(&f, &isa).unwrap();
        let dom = clc_analyses::DominatorTree::compute(&f, &cfg);
        let freq = clc_analyses::BlockFrequency::compute(&f, &cfg, &dom);
        let live = Liveness::compute(&f, &isa, &cfg).unwrap();
        let live_now = LiveNow::compute(&f, &isa, &live).unwrap();
        let ig = InterferenceGraph::compute(&f, &isa, &live, &live_now).unwrap();
        let spill = SpillCost::compute(&f, &isa, &freq, &ig).unwrap();
        let regs: Vec<String> = ["a", "b", "c", "t", "u"].iter().map(|s| s.to_string()).collect();

        match color(Variant::TopDown, &ig, &spill, 1, &regs) {
            ColorOutcome::Spill(victim) => assert!(victim == "t" || victim == "c"),
            ColorOutcome::Colored(_) => panic!("k=1 cannot color an interfering pair"),
        }
    }
}
