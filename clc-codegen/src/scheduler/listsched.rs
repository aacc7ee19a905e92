//! The forward list scheduler (spec §4.1 steps 4–5): single-issue,
//! cycle-stepping, picking from a ready set by critical-path-first /
//! successor-count tie-breaks.

use super::depgraph::DepGraph;

fn pick_best(ready: &[usize], priority: &[u32], graph: &DepGraph) -> Option<usize> {
    if ready.is_empty() {
        return None;
    }
    let mut best = 0;
    for i in 1..ready.len() {
        if better(ready[i], ready[best], priority, graph) {
            best = i;
        }
    }
    Some(best)
}

/// `a` is preferred over `b` by: (1) higher latency-to-sink, (2) more
/// successors, (3) earlier program position (lower node id) as the final
/// deterministic tie-break.
fn better(a: usize, b: usize, priority: &[u32], graph: &DepGraph) -> bool {
    (priority[a], graph.succs[a].len(), std::cmp::Reverse(a))
        > (priority[b], graph.succs[b].len(), std::cmp::Reverse(b))
}

/// Assigns every node of `graph` a start cycle. `priority[n]` is the
/// latency-to-sink used as the primary tie-break; `own_latency[n]` is the
/// node's own per-opcode cycle count, used to compute its finish time.
pub fn schedule_with_latency(graph: &DepGraph, priority: &[u32], own_latency: &[u32]) -> Vec<u32> {
    let n = graph.nodes.len();
    let mut start = vec![0u32; n];
    let mut remaining_preds: Vec<usize> = graph.preds.iter().map(Vec::len).collect();
    let mut ready: Vec<usize> = (0..n).filter(|&i| remaining_preds[i] == 0).collect();
    let mut active: Vec<(usize, u32)> = Vec::new();
    let mut cycle = 0u32;
    let mut remaining = n;

    while remaining > 0 {
        let mut still_active = Vec::new();
        for &(node, finish) in &active {
            if finish <= cycle {
                for &succ in &graph.succs[node] {
                    remaining_preds[succ] -= 1;
                    if remaining_preds[succ] == 0 {
                        ready.push(succ);
                    }
                }
            } else {
                still_active.push((node, finish));
            }
        }
        active = still_active;

        if let Some(pick_pos) = pick_best(&ready, priority, graph) {
            let node = ready.remove(pick_pos);
            start[node] = cycle;
            active.push((node, cycle + own_latency[node]));
            remaining -= 1;
        }

        cycle += 1;
    }

    start
}
