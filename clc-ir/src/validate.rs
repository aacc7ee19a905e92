//! Structural validation, run once after parse and once after every
//! transformation (spec §5, §7): a pass whose output fails validation is a
//! bug, not a recoverable condition.

use crate::entities::Block;
use crate::function::Function;
use crate::isa::{IsaContext, UnknownOpcode};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    #[error("function `{func}`: block `{block}` is empty")]
    EmptyBlock { func: String, block: String },

    #[error("function `{func}`: block `{block}` instruction {index} (`{opcode}`) is a terminator but is not the last instruction")]
    MidBlockTerminator { func: String, block: String, index: usize, opcode: String },

    #[error("function `{func}`: block `{block}` does not end in a terminator")]
    MissingTerminator { func: String, block: String },

    #[error("function `{func}`: block `{block}` branches to unknown block `{target}`")]
    UnknownBranchTarget { func: String, block: String, target: String },

    #[error("function `{func}`: block `{block}`, instruction {index}: {source}")]
    Opcode {
        func: String,
        block: String,
        index: usize,
        #[source]
        source: UnknownOpcode,
    },

    #[error("function `{func}`: block `{block}`: phi `{reg}` has {got} operand(s), expected {want} (one per predecessor)")]
    PhiArityMismatch { func: String, block: String, reg: String, got: usize, want: usize },

    #[error("function `{func}`: block `{block}`: use of undefined register `%{reg}` at instruction {index}")]
    UndefinedUse { func: String, block: String, reg: String, index: usize },
}

/// Validates structural invariants that do not require CFG analysis
/// (terminator placement, branch targets, opcode legality, phi arity against
/// predecessor count). `preds` is optional: when supplied (the caller has a
/// CFG on hand), phi arity is checked against actual predecessor counts;
/// otherwise phi-arity checking is skipped (the caller must re-validate
/// after computing a CFG if it cares).
pub fn validate(
    func: &Function,
    isa: &IsaContext,
    preds: Option<&dyn Fn(Block) -> usize>,
) -> Result<(), VerifyError> {
    let known_blocks: FxHashSet<Block> = func.block_order().iter().copied().collect();

    let mut all_defined: FxHashSet<&str> = func.params.iter().map(String::as_str).collect();
    for reg in isa.reserved_registers() {
        all_defined.insert(reg);
    }
    for (_, data) in func.blocks() {
        for inst in &data.insts {
            if let Ok(defs) = inst.defs(isa) {
                all_defined.extend(defs);
            }
        }
    }

    for &b in func.block_order() {
        let data = func.block(b);
        if data.is_empty() {
            return Err(VerifyError::EmptyBlock { func: func.name.clone(), block: data.name.clone() });
        }
        let last = data.len() - 1;
        for (i, inst) in data.insts.iter().enumerate() {
            let is_term = inst.is_terminator(isa).map_err(|e| VerifyError::Opcode {
                func: func.name.clone(),
                block: data.name.clone(),
                index: i,
                source: e,
            })?;
            if is_term && i != last {
                return Err(VerifyError::MidBlockTerminator {
                    func: func.name.clone(),
                    block: data.name.clone(),
                    index: i,
                    opcode: inst.opcode.clone(),
                });
            }
            if !is_term && i == last {
                return Err(VerifyError::MissingTerminator { func: func.name.clone(), block: data.name.clone() });
            }
            if is_term {
                for target in inst.branch_targets(isa).map_err(|e| VerifyError::Opcode {
                    func: func.name.clone(),
                    block: data.name.clone(),
                    index: i,
                    source: e,
                })? {
                    if func.block_by_name(target).map_or(true, |t| !known_blocks.contains(&t)) {
                        return Err(VerifyError::UnknownBranchTarget {
                            func: func.name.clone(),
                            block: data.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
            if !inst.is_phi() {
                for reg in inst.uses(isa).map_err(|e| VerifyError::Opcode {
                    func: func.name.clone(),
                    block: data.name.clone(),
                    index: i,
                    source: e,
                })? {
                    if !all_defined.contains(reg) {
                        return Err(VerifyError::UndefinedUse {
                            func: func.name.clone(),
                            block: data.name.clone(),
                            reg: reg.to_string(),
                            index: i,
                        });
                    }
                }
            }
            if let Some(operands) = inst.phi_operands() {
                if let Some(want) = preds.map(|f| f(b)) {
                    if operands.len() != want {
                        return Err(VerifyError::PhiArityMismatch {
                            func: func.name.clone(),
                            block: data.name.clone(),
                            reg: inst.phi_def().unwrap_or_default().to_string(),
                            got: operands.len(),
                            want,
                        });
                    }
                }
                for (_, reg) in operands {
                    if !all_defined.contains(reg) {
                        return Err(VerifyError::UndefinedUse {
                            func: func.name.clone(),
                            block: data.name.clone(),
                            reg: reg.to_string(),
                            index: i,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
