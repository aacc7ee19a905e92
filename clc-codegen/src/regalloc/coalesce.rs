//! Move coalescing, Bottom-Up variant only (spec §4.3 "Coalescing"):
//! repeatedly contract a `mov lr_d, lr_u` pair that does not interfere,
//! deleting the move and renaming every reference of `lr_d` to `lr_u`.
//! Rather than re-densifying the live-range id space after every single
//! contraction, this accumulates contractions in a union-find and renumbers
//! once at the end, returning the old→new id permutation (`SPEC_FULL.md`
//! §C.2 names this permutation-returning shape explicitly).

use super::error::AllocError;
use clc_analyses::{ControlFlowGraph, InterferenceGraph, LiveNow, Liveness};
use clc_ir::{Function, IsaContext, Token};

/// Runs coalescing to a fixpoint. Returns the old-id -> new-id permutation:
/// live range `i` before this call is named `lr{result[i]}` afterward.
/// Every id in `0..lr_count` must appear in the function for this to be
/// meaningful; the caller is expected to have just run
/// [`super::live_range::LiveRanges::rewrite`].
pub fn coalesce(func: &mut Function, isa: &IsaContext, lr_count: usize) -> Result<Vec<usize>, AllocError> {
    let mut parent: Vec<usize> = (0..lr_count).collect();

    loop {
        let cfg = ControlFlowGraph::compute(func, isa)?;
        let live = Liveness::compute(func, isa, &cfg)?;
        let live_now = LiveNow::compute(func, isa, &live)?;
        let ig = InterferenceGraph::compute(func, isa, &live, &live_now)?;

        let mut contraction = None;
        'search: for &b in func.block_order() {
            for inst in &func.block(b).insts {
                if let Some((d, u)) = inst.as_mov() {
                    if d != u && !ig.interferes(d, u) {
                        contraction = Some((d.to_string(), u.to_string()));
                        break 'search;
                    }
                }
            }
        }

        let Some((d, u)) = contraction else { break };
        let (d_id, u_id) = (lr_id(&d), lr_id(&u));
        let (ru, rd) = (find(&mut parent, u_id), find(&mut parent, d_id));
        parent[rd] = ru;

        for &b in func.block_order().to_vec().iter() {
            let mut kept = Vec::with_capacity(func.block(b).insts.len());
            for inst in func.block(b).insts.iter().cloned() {
                if inst.as_mov() == Some((d.as_str(), u.as_str())) {
                    continue;
                }
                kept.push(inst);
            }
            func.block_mut(b).insts = kept;
        }
        rename(func, &d, &u);
    }

    let mut roots: Vec<usize> = (0..lr_count).map(|i| find(&mut parent, i)).collect();
    let mut dense: Vec<usize> = roots.clone();
    dense.sort_unstable();
    dense.dedup();
    let permutation: Vec<usize> = roots
        .drain(..)
        .map(|r| dense.binary_search(&r).expect("root is in dense"))
        .collect();

    for &b in func.block_order().to_vec().iter() {
        for inst in func.block_mut(b).insts.iter_mut() {
            for tok in inst.args.iter_mut() {
                if let Token::Reg(r) = tok {
                    if let Some(id) = try_lr_id(r) {
                        *r = format!("lr{}", permutation[id]);
                    }
                }
            }
        }
    }

    Ok(permutation)
}

fn rename(func: &mut Function, from: &str, to: &str) {
    for &b in func.block_order().to_vec().iter() {
        for inst in func.block_mut(b).insts.iter_mut() {
            for tok in inst.args.iter_mut() {
                if let Token::Reg(r) = tok {
                    if r == from {
                        *r = to.to_string();
                    }
                }
            }
        }
    }
}

fn lr_id(name: &str) -> usize {
    try_lr_id(name).expect("coalescing only runs on live-range-named registers")
}

fn try_lr_id(name: &str) -> Option<usize> {
    name.strip_prefix("lr")?.parse().ok()
}

fn find(parent: &mut [usize], x: usize) -> usize {
    if parent[x] != x {
        parent[x] = find(parent, parent[x]);
    }
    parent[x]
}
