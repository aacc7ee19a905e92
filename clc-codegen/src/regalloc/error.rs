use clc_ir::UnknownOpcode;

/// Errors the register allocator can report (spec §7 class 5: invariant
/// violations are bugs, not user errors, but still need a diagnosable
/// message rather than a panic at the library boundary).
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("live range `{live_range}` in function `{function}` has infinite spill cost and cannot be colored with {k} registers")]
    Unspillable { function: String, live_range: String, k: usize },
    #[error("register allocation for function `{function}` did not converge after {attempts} spill rounds")]
    NotConverging { function: String, attempts: usize },
}

impl From<UnknownOpcode> for AllocError {
    fn from(e: UnknownOpcode) -> Self {
        AllocError::UnknownOpcode(e.0)
    }
}
