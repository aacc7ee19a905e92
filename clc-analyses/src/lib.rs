//! Pure analyses over a [`clc_ir::Function`]: control flow, dominance,
//! liveness, extended-basic-block structure, static frequency, and the
//! interference graph the register allocator colors. None of these types
//! live on `Function` itself (this crate sits above `clc-ir`); callers
//! compute what they need and thread the results through, the same way
//! `cranelift-codegen`'s `Context` holds its passes as separate named
//! fields rather than methods on `Function`.

pub mod block_freq;
pub mod cfg;
pub mod dom_frontier;
pub mod dominance;
pub mod ebb;
pub mod interference;
pub mod live_now;
pub mod liveness;
pub mod spill_cost;

pub use block_freq::BlockFrequency;
pub use cfg::ControlFlowGraph;
pub use dom_frontier::DominanceFrontier;
pub use dominance::DominatorTree;
pub use ebb::{paths as ebb_paths, EbbPartition};
pub use interference::InterferenceGraph;
pub use live_now::LiveNow;
pub use liveness::Liveness;
pub use spill_cost::SpillCost;
