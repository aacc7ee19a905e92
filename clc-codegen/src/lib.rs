//! The three tightly related cores of the workbench: the instruction
//! scheduler, the BURS instruction selector, and the SSA register allocator.
//! Everything else (parsing, analyses, CLI, logging sidecar) lives in the
//! sibling crates and is consumed here as a pure collaborator.

pub mod regalloc;
pub mod scheduler;
pub mod selector;
