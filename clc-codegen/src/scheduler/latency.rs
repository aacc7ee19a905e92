//! The opcode → cycle-count latency table (spec §4.1 "Inputs"), and the
//! per-node longest-path-to-sink computation that feeds the list
//! scheduler's primary tie-break.

use super::depgraph::DepGraph;
use super::error::SchedError;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct LatencyTable {
    cycles: FxHashMap<String, u32>,
}

impl LatencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, opcode: impl Into<String>, cycles: u32) {
        self.cycles.insert(opcode.into(), cycles);
    }

    /// Looks up an opcode's latency, falling back to the table's `default`
    /// entry (as in spec §8 scenario S1's `{..., default: 1}` table) if the
    /// opcode has no specific entry. An opcode missing from both is a hard
    /// error (spec §4.1 "Failure semantics").
    pub fn lookup(&self, opcode: &str, function: &str, block: &str) -> Result<u32, SchedError> {
        if let Some(&c) = self.cycles.get(opcode) {
            return Ok(c);
        }
        if let Some(&c) = self.cycles.get("default") {
            return Ok(c);
        }
        Err(SchedError::MissingLatency {
            function: function.to_string(),
            block: block.to_string(),
            opcode: opcode.to_string(),
        })
    }
}

/// Returns `(latency_to_sink, own_latency)`. `latency_to_sink[n]` is the
/// longest delay-weighted path from node `n` to any sink of the region's
/// dependency graph, including `n`'s own latency; `own_latency[n]` is just
/// `n`'s per-opcode cycle count. Computed bottom-up: since every edge in
/// `graph` runs from an earlier program position to a later one, visiting
/// nodes in reverse program order guarantees every successor is already
/// resolved.
pub fn latency_to_sink(
    graph: &DepGraph,
    latencies: &LatencyTable,
    function: &str,
) -> Result<(Vec<u32>, Vec<u32>), SchedError> {
    let n = graph.nodes.len();
    let mut result = vec![0u32; n];
    let mut own_latency = vec![0u32; n];
    for i in (0..n).rev() {
        let (block, inst_idx) = graph.nodes[i];
        let opcode = &graph.instruction(i).opcode;
        let own = latencies.lookup(opcode, function, &block_name(graph, block, inst_idx))?;
        own_latency[i] = own;
        let best_succ = graph.succs[i].iter().map(|&s| result[s]).max().unwrap_or(0);
        result[i] = own + best_succ;
    }
    Ok((result, own_latency))
}

fn block_name(graph: &DepGraph, block: clc_ir::Block, _inst_idx: usize) -> String {
    graph.block_names[&block].clone()
}
