//! The instruction scheduler core (spec §4.1): dependency-graph
//! construction, per-node latency, single-issue list scheduling, and (in
//! the EBB variant) cross-block motion with compensation code.

mod depgraph;
mod error;
mod latency;
mod listsched;
mod region;
mod rename;
mod reorder;

pub use depgraph::DepGraph;
pub use error::SchedError;
pub use latency::LatencyTable;
pub use region::RankedPath;

use clc_analyses::{ControlFlowGraph, Liveness};
use clc_ir::{Block, Function, IsaContext};
use rustc_hash::FxHashSet;

/// Schedules every block of `func` independently (the "Simpler local
/// variant" of spec §4.1/§4.3's sibling description — one block is one
/// region, no cross-block motion).
pub fn schedule_local(func: &mut Function, isa: &IsaContext, latencies: &LatencyTable) -> Result<(), SchedError> {
    let cfg = ControlFlowGraph::compute(func, isa)?;
    let live = Liveness::compute(func, isa, &cfg)?;
    rename::rename_function(func, isa, &live)?;

    for b in func.block_order().to_vec() {
        schedule_region(func, isa, &cfg, &[b], latencies, 0)?;
    }
    Ok(())
}

/// Schedules `func` along its EBB paths, in decreasing static-probability
/// order, allowing instructions to migrate across block boundaries within a
/// path (spec §4.1's EBB variant).
pub fn schedule_ebb(func: &mut Function, isa: &IsaContext, latencies: &LatencyTable) -> Result<(), SchedError> {
    let cfg = ControlFlowGraph::compute(func, isa)?;
    let live = Liveness::compute(func, isa, &cfg)?;
    rename::rename_function(func, isa, &live)?;

    let paths = region::select_paths(func, &cfg);
    let mut committed: FxHashSet<Block> = FxHashSet::default();

    for ranked in &paths {
        let path = &ranked.blocks;
        if path.iter().all(|b| committed.contains(b)) {
            continue;
        }
        let freeze_upto = path.iter().take_while(|b| committed.contains(b)).count();
        schedule_region(func, isa, &cfg, path, latencies, freeze_upto)?;
        for &b in &path[freeze_upto..] {
            committed.insert(b);
        }
    }

    // Any block untouched by EBB path enumeration (unreachable from the
    // entry) is still scheduled locally so every block ends in a valid
    // terminator-ordered list.
    for b in func.block_order().to_vec() {
        if !committed.contains(&b) {
            schedule_region(func, isa, &cfg, &[b], latencies, 0)?;
        }
    }
    Ok(())
}

fn schedule_region(
    func: &mut Function,
    isa: &IsaContext,
    cfg: &ControlFlowGraph,
    region: &[Block],
    latencies: &LatencyTable,
    freeze_upto: usize,
) -> Result<(), SchedError> {
    let graph = DepGraph::build(func, isa, region)?;
    let (priority, own_latency) = latency::latency_to_sink(&graph, latencies, &func.name)?;
    let start = listsched::schedule_with_latency(&graph, &priority, &own_latency);
    reorder::reorder_with_compensation(func, cfg, region, &graph, &start, freeze_upto);
    Ok(())
}
