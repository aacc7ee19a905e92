//! Dependency-graph construction over a scheduling region (spec §4.1,
//! step 1). A region is a path of one or more blocks, flattened into a
//! single node-per-instruction sequence in program order; the local
//! (single-block) scheduler is the degenerate one-block case. Edges are
//! built from a def/use scan: true, anti, and output dependences between
//! instructions, plus memory-ordering edges between loads and stores and
//! the anchoring edges spec §4.1 mandates at block entries and terminators.

use super::error::SchedError;
use clc_ir::{Block, Function, Instruction, IsaContext};
use rustc_hash::FxHashMap;

pub struct DepGraph {
    /// Flattened node positions: `(block, instruction-index-within-block)`,
    /// one per instruction of the region, in program order.
    pub nodes: Vec<(Block, usize)>,
    pub preds: Vec<Vec<usize>>,
    pub succs: Vec<Vec<usize>>,
    /// The node id of the terminator of the region's last block (spec
    /// §4.1's "terminal").
    pub terminal: usize,
    /// `region_index[n]` is the 0-based index of `n`'s originating block
    /// within the region (path) passed to [`DepGraph::build`].
    pub region_index: Vec<usize>,
    /// `block_terminal[i]` is the node id of the terminator of the region's
    /// `i`-th block.
    pub block_terminal: Vec<usize>,
    pub(super) block_names: FxHashMap<Block, String>,
    instructions: Vec<Instruction>,
}

impl DepGraph {
    pub fn instruction(&self, node: usize) -> &Instruction {
        &self.instructions[node]
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if from == to || self.succs[from].contains(&to) {
            return;
        }
        self.succs[from].push(to);
        self.preds[to].push(from);
    }

    /// Builds the dependency graph for `region`, a path of blocks in
    /// program order (length 1 for the local variant).
    pub fn build(func: &Function, isa: &IsaContext, region: &[Block]) -> Result<Self, SchedError> {
        let mut nodes = Vec::new();
        let mut instructions = Vec::new();
        let mut block_names = FxHashMap::default();
        let mut block_bounds = Vec::with_capacity(region.len()); // (start, end) node id range per region block
        for &b in region {
            block_names.insert(b, func.block(b).name.clone());
            let start = nodes.len();
            for (i, inst) in func.block(b).insts.iter().enumerate() {
                nodes.push((b, i));
                instructions.push(inst.clone());
            }
            block_bounds.push((start, nodes.len()));
        }

        let n = nodes.len();
        let mut region_index = vec![0usize; n];
        let block_terminal: Vec<usize> = block_bounds.iter().map(|&(_, end)| end - 1).collect();
        for (bi, &(start, end)) in block_bounds.iter().enumerate() {
            for idx in region_index.iter_mut().take(end).skip(start) {
                *idx = bi;
            }
        }

        let mut g = DepGraph {
            nodes,
            preds: vec![Vec::new(); n],
            succs: vec![Vec::new(); n],
            terminal: n.saturating_sub(1),
            region_index,
            block_terminal,
            block_names,
            instructions,
        };

        let mut last_def: FxHashMap<String, usize> = FxHashMap::default();
        let mut last_use: FxHashMap<String, usize> = FxHashMap::default();
        let mut stores_in_block: Vec<usize> = Vec::new();
        let mut current_region_block = 0usize;

        for node in 0..n {
            if current_region_block + 1 < block_bounds.len()
                && node >= block_bounds[current_region_block].1
            {
                current_region_block += 1;
                stores_in_block.clear();
            }

            let inst = g.instructions[node].clone();
            let uses: Vec<String> = inst.uses(isa)?.into_iter().map(str::to_string).collect();
            let defs: Vec<String> = inst.defs(isa)?.into_iter().map(str::to_string).collect();

            for u in &uses {
                if let Some(&d) = last_def.get(u.as_str()) {
                    g.add_edge(d, node); // true dependence
                }
            }
            if inst.is_load() {
                for &s in &stores_in_block {
                    g.add_edge(s, node); // memory ordering
                }
            }
            for d in &defs {
                if let Some(&prior_def) = last_def.get(d.as_str()) {
                    g.add_edge(prior_def, node); // output dependence
                }
                if let Some(&prior_use) = last_use.get(d.as_str()) {
                    g.add_edge(prior_use, node); // anti dependence
                }
            }
            for u in &uses {
                last_use.insert(u.clone(), node);
            }
            for d in &defs {
                last_def.insert(d.clone(), node);
            }
            if inst.is_store() {
                stores_in_block.push(node);
            }

            // Block-entry edge: an instruction with no predecessors yet,
            // sitting in a non-first block of the path, is anchored to the
            // previous block's terminator so it cannot float earlier than
            // its own block's entry.
            if current_region_block > 0 && g.preds[node].is_empty() {
                let prev_terminal = block_bounds[current_region_block - 1].1 - 1;
                g.add_edge(prev_terminal, node);
            }
        }

        // Last-terminal edges: every sink other than the region's own
        // terminal is anchored to it.
        for node in 0..n {
            if node != g.terminal && g.succs[node].is_empty() {
                g.add_edge(node, g.terminal);
            }
        }

        Ok(g)
    }
}
