//! Entity references into a [`Function`](crate::function::Function).
//!
//! Blocks and instructions are referenced by dense `u32` indices rather than
//! by pointer, so that graphs built over them (dependency graphs,
//! expression forests, interference graphs) can use plain integer-indexed
//! vectors instead of chasing pointers. See the "Cyclic / shared graphs"
//! design note.

use cranelift_entity::entity_impl;

/// A reference to a [`BasicBlockData`](crate::block::BasicBlockData) inside a
/// [`Function`](crate::function::Function).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to an [`Instruction`](crate::instruction::Instruction) inside
/// a particular block. Stable only within that block's instruction list;
/// instructions are identified across blocks by `(Block, Inst)` pairs.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");
