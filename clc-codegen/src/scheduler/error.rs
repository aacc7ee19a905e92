use clc_ir::UnknownOpcode;

/// Errors the scheduler can report. Per spec class 2 ("unknown opcode /
/// missing latency"): a missing latency-table entry is a hard error, not a
/// silently-assumed default.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("no latency entry for opcode `{opcode}` (function `{function}`, block `{block}`)")]
    MissingLatency { function: String, block: String, opcode: String },
}

impl From<UnknownOpcode> for SchedError {
    fn from(e: UnknownOpcode) -> Self {
        SchedError::UnknownOpcode(e.0)
    }
}
