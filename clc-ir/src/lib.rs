//! The IR substrate shared by the scheduler, selector and register
//! allocator: [`Module`], [`function::Function`],
//! [`block::BasicBlockData`], [`instruction::Instruction`], and the
//! [`isa::IsaContext`] that classifies instruction arguments.
//!
//! This crate owns data only. Analyses (CFG, dominance, liveness, ...) are
//! pure functions over a `Function` living in `clc-analyses`; the three
//! cores (`clc-codegen`) consume both.

pub mod block;
pub mod entities;
pub mod function;
pub mod instruction;
pub mod isa;
pub mod module;
pub mod validate;

pub use block::BasicBlockData;
pub use entities::{Block, Inst};
pub use function::Function;
pub use instruction::{Instruction, Token};
pub use isa::{ArgKind, InstKind, IsaContext, OpcodeSpec, UnknownOpcode};
pub use module::Module;
pub use validate::{validate, VerifyError};

#[cfg(test)]
mod tests {
    use super::*;

    fn isa_with_arith() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("loadAI", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::Const, ArgKind::RegDef]);
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("store", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse]);
        isa.define("ret", InstKind::Return, vec![]);
        isa.define("br", InstKind::Branch, vec![ArgKind::BlockLabel]);
        isa.reserve_register("sp");
        isa
    }

    #[test]
    fn single_terminator_block_validates() {
        let isa = isa_with_arith();
        let mut f = Function::new("f", vec!["r0".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new("ret", vec![]));
        validate(&f, &isa, None).expect("single-terminator block is valid");
    }

    #[test]
    fn empty_block_is_rejected() {
        let isa = isa_with_arith();
        let mut f = Function::new("f", vec![]);
        f.push_block("b0");
        assert!(matches!(validate(&f, &isa, None), Err(VerifyError::EmptyBlock { .. })));
    }

    #[test]
    fn mid_block_terminator_is_rejected() {
        let isa = isa_with_arith();
        let mut f = Function::new("f", vec!["r0".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new("ret", vec![]));
        f.block_mut(b0).push(Instruction::new("ret", vec![]));
        assert!(matches!(validate(&f, &isa, None), Err(VerifyError::MidBlockTerminator { .. })));
    }

    #[test]
    fn unknown_branch_target_is_rejected() {
        let isa = isa_with_arith();
        let mut f = Function::new("f", vec![]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new("br", vec![Token::Label("nope".into())]));
        assert!(matches!(validate(&f, &isa, None), Err(VerifyError::UnknownBranchTarget { .. })));
    }

    #[test]
    fn use_of_undefined_register_is_rejected() {
        let isa = isa_with_arith();
        let mut f = Function::new("f", vec![]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new(
            "store",
            vec![Token::Reg("r9".into()), Token::Reg("r8".into())],
        ));
        f.block_mut(b0).push(Instruction::new("ret", vec![]));
        assert!(matches!(validate(&f, &isa, None), Err(VerifyError::UndefinedUse { .. })));
    }

    #[test]
    fn defs_and_uses_classify_by_isa_context() {
        let isa = isa_with_arith();
        let inst = Instruction::new(
            "loadAI",
            vec![Token::Reg("r0".into()), Token::Const(8), Token::Reg("r1".into())],
        );
        assert_eq!(inst.uses(&isa).unwrap(), vec!["r0"]);
        assert_eq!(inst.defs(&isa).unwrap(), vec!["r1"]);
    }
}
