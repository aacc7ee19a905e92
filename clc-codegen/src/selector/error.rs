use clc_ir::UnknownOpcode;

/// Errors the instruction selector can report (spec §7 classes 2 and 3).
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("no rule covers node {node} of function `{function}`, block `{block}` against non-terminal `{nonterminal}`")]
    NoCover { function: String, block: String, node: usize, nonterminal: String },
    #[error("placeholder `${0}` could not be resolved")]
    BadPlaceholder(String),
}

impl From<UnknownOpcode> for SelectError {
    fn from(e: UnknownOpcode) -> Self {
        SelectError::UnknownOpcode(e.0)
    }
}
