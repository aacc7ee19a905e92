//! The interference graph: an edge between two registers iff one is live
//! immediately after the instruction that defines the other. For programs in
//! SSA form this captures exactly the simultaneously-live pairs (the live
//! ranges form a chordal graph), so only def points need to be visited.
//! Storage is a dense adjacency-set map rather than a pointer graph, so the
//! structure stays valid across the allocator's repeated recomputation
//! (spec §9 "Cyclic / shared graphs").

use crate::liveness::Liveness;
use crate::live_now::LiveNow;
use clc_ir::{Function, IsaContext, UnknownOpcode};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Default)]
pub struct InterferenceGraph {
    adj: FxHashMap<String, FxHashSet<String>>,
}

impl InterferenceGraph {
    pub fn compute(
        func: &Function,
        isa: &IsaContext,
        live: &Liveness,
        live_now: &LiveNow,
    ) -> Result<Self, UnknownOpcode> {
        let mut g = Self::default();

        for (b, data) in func.blocks() {
            let phi_defs: Vec<&str> = data.insts.iter().filter_map(|i| i.phi_def()).collect();
            for (i, &d) in phi_defs.iter().enumerate() {
                for &other in phi_defs.iter().skip(i + 1) {
                    g.add_edge(d, other);
                }
                for live_in_reg in live.live_in(b) {
                    g.add_edge(d, live_in_reg);
                }
            }

            for (idx, inst) in data.insts.iter().enumerate() {
                if inst.is_phi() {
                    continue;
                }
                for d in inst.defs(isa)? {
                    for r in live_now.after(b, idx) {
                        if r != d {
                            g.add_edge(d, r);
                        }
                    }
                }
            }
        }

        Ok(g)
    }

    fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.adj.entry(a.to_string()).or_default().insert(b.to_string());
        self.adj.entry(b.to_string()).or_default().insert(a.to_string());
    }

    pub fn interferes(&self, a: &str, b: &str) -> bool {
        self.adj.get(a).is_some_and(|s| s.contains(b))
    }

    pub fn neighbors(&self, r: &str) -> impl Iterator<Item = &str> {
        self.adj.get(r).into_iter().flatten().map(String::as_str)
    }

    pub fn degree(&self, r: &str) -> usize {
        self.adj.get(r).map_or(0, |s| s.len())
    }

    pub fn registers(&self) -> impl Iterator<Item = &str> {
        self.adj.keys().map(String::as_str)
    }
}
