//! The ISA description: opcode -> (instruction kind, argument-kind sequence).
//!
//! Mirrors the `@ins <kind> <opname> <argspec>*` file format of spec §6.
//! Immutable once loaded, shared by reference, never mutated by any pass —
//! the same "loaded once, read-shared" treatment `cranelift-codegen` gives
//! its static `isa::Builder` tables.

use rustc_hash::{FxHashMap, FxHashSet};

/// The control-transfer behavior of an opcode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InstKind {
    Normal,
    Call,
    Return,
    Branch,
}

impl InstKind {
    pub fn is_terminator(self) -> bool {
        matches!(self, InstKind::Return | InstKind::Branch)
    }
}

/// The role of a single argument position, or a repeat of the previous role
/// for a variadic tail (spec §3: "a variadic repeat of the previous
/// classification").
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArgKind {
    RegUse,
    RegDef,
    UseDef,
    Const,
    BlockLabel,
    FuncLabel,
    /// Repeats the previous argument kind for every remaining token.
    Repeat,
}

impl ArgKind {
    fn from_token(tok: &str) -> Option<ArgKind> {
        Some(match tok {
            "r" => ArgKind::RegUse,
            "d" => ArgKind::RegDef,
            "x" => ArgKind::UseDef,
            "c" => ArgKind::Const,
            "b" => ArgKind::BlockLabel,
            "f" => ArgKind::FuncLabel,
            "u" => ArgKind::RegUse,
            "*" => ArgKind::Repeat,
            _ => return None,
        })
    }
}

/// One opcode's metadata: its control-transfer kind and the sequence of
/// argument kinds it expects. If the last entry is `Repeat`, the argument
/// before it is repeated for all remaining tokens (spec §3 "variadic tail").
#[derive(Clone, Debug)]
pub struct OpcodeSpec {
    pub kind: InstKind,
    pub args: Vec<ArgKind>,
}

impl OpcodeSpec {
    /// The argument kind expected at `pos` (0-based), expanding the
    /// variadic tail if present. `None` if `pos` is out of range for a
    /// non-variadic spec.
    pub fn arg_kind_at(&self, pos: usize) -> Option<ArgKind> {
        if self.args.is_empty() {
            return None;
        }
        if matches!(self.args.last(), Some(ArgKind::Repeat)) {
            let fixed = &self.args[..self.args.len() - 1];
            if pos < fixed.len() {
                Some(fixed[pos])
            } else if fixed.is_empty() {
                None
            } else {
                Some(fixed[fixed.len() - 1])
            }
        } else {
            self.args.get(pos).copied()
        }
    }
}

/// An immutable opcode -> spec table, plus the set of ISA-reserved register
/// names (e.g. the stack pointer) that the allocator must never color or
/// spill.
#[derive(Clone, Debug, Default)]
pub struct IsaContext {
    opcodes: FxHashMap<String, OpcodeSpec>,
    reserved: FxHashSet<String>,
}

impl IsaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, opcode: impl Into<String>, kind: InstKind, args: Vec<ArgKind>) {
        self.opcodes.insert(opcode.into(), OpcodeSpec { kind, args });
    }

    pub fn reserve_register(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    pub fn lookup(&self, opcode: &str) -> Option<&OpcodeSpec> {
        self.opcodes.get(opcode)
    }

    pub fn is_reserved(&self, reg: &str) -> bool {
        self.reserved.contains(reg)
    }

    pub fn reserved_registers(&self) -> impl Iterator<Item = &str> {
        self.reserved.iter().map(String::as_str)
    }

    pub(crate) fn arg_kind_token(tok: &str) -> Option<ArgKind> {
        ArgKind::from_token(tok)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown opcode `{0}`")]
pub struct UnknownOpcode(pub String);
