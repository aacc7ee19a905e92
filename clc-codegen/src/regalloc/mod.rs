//! The SSA register allocator core (spec §4.3): live-range construction,
//! coalescing, two graph-coloring variants with iterative spilling, and the
//! simpler local single-block variant.

mod coalesce;
mod color;
mod error;
mod live_range;
mod local;
mod spill;
mod spill_cost;

pub use color::Variant;
pub use error::AllocError;
pub use live_range::LiveRanges;
pub use spill_cost::SpillCost;

use clc_analyses::{BlockFrequency, ControlFlowGraph, DominatorTree, InterferenceGraph, LiveNow, Liveness};
use clc_ir::{Function, IsaContext, Token};

const MAX_SPILL_ROUNDS: usize = 64;

/// Allocates `func` in place against `k` hardware registers. Picks the
/// single-block local variant automatically when the function has exactly
/// one block (spec §4.3 "Simpler local variant"); otherwise runs the
/// requested graph-coloring variant, coalescing first when it is Bottom-Up.
pub fn allocate_function(func: &mut Function, isa: &IsaContext, sp: &str, k: usize, variant: Variant) -> Result<(), AllocError> {
    if func.num_blocks() == 1 {
        let spill_base = spill::next_spill_base(func, isa, sp)?;
        let b = func.entry().expect("a function with one block has an entry");
        local::allocate_block(func.block_mut(b), isa, sp, k, spill_base)?;
        return Ok(());
    }

    let lr = LiveRanges::compute(func, isa)?;
    lr.rewrite(func, isa);
    let mut lr_count = lr.count();

    if variant == Variant::BottomUp {
        let perm = coalesce::coalesce(func, isa, lr_count)?;
        lr_count = perm.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    }

    for attempt in 0..MAX_SPILL_ROUNDS {
        let cfg = ControlFlowGraph::compute(func, isa)?;
        let dom = DominatorTree::compute(func, &cfg);
        let freq = BlockFrequency::compute(func, &cfg, &dom);
        let live = Liveness::compute(func, isa, &cfg)?;
        let live_now = LiveNow::compute(func, isa, &live)?;
        let ig = InterferenceGraph::compute(func, isa, &live, &live_now)?;
        let spill_cost = SpillCost::compute(func, isa, &freq, &ig)?;

        let registers: Vec<String> = (0..lr_count).map(|i| format!("lr{i}")).collect();

        match color::color(variant, &ig, &spill_cost, k, &registers) {
            color::ColorOutcome::Colored(colors) => {
                apply_colors(func, isa, sp, &colors);
                return Ok(());
            }
            color::ColorOutcome::Spill(victim) => {
                if spill_cost.is_unspillable(&victim) {
                    return Err(AllocError::Unspillable { function: func.name.clone(), live_range: victim, k });
                }
                lr_count = spill::spill(func, isa, sp, &victim, lr_count)?;
                if variant == Variant::BottomUp {
                    let perm = coalesce::coalesce(func, isa, lr_count)?;
                    lr_count = perm.iter().copied().max().map(|m| m + 1).unwrap_or(0);
                }
                let _ = attempt;
            }
        }
    }

    Err(AllocError::NotConverging { function: func.name.clone(), attempts: MAX_SPILL_ROUNDS })
}

fn apply_colors(func: &mut Function, isa: &IsaContext, sp: &str, colors: &rustc_hash::FxHashMap<String, usize>) {
    for &b in func.block_order().to_vec().iter() {
        for inst in func.block_mut(b).insts.iter_mut() {
            for tok in inst.args.iter_mut() {
                if let Token::Reg(r) = tok {
                    if r == sp || isa.is_reserved(r) {
                        continue;
                    }
                    if let Some(&c) = colors.get(r) {
                        *r = format!("hr{c}");
                    }
                }
            }
        }
    }
}
