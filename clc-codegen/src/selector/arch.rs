//! Architecture-specific selector passes (spec §4.2 "Architecture-specific
//! module passes"): a pre-IR pass that lowers `alloca` to `sp`-relative
//! arithmetic and wraps `ret`s with frame adjustment, and a post-ASM pass
//! that drops unconditional jumps to the immediately-following block.
//! `SPEC_FULL.md` §D names two illustrative architectures, `generic64` and
//! `generic-risc`, in place of the teacher's real targets; both share this
//! pass shape and differ only in their rule sets.

use super::error::SelectError;
use super::rules::RuleSet;
use clc_ir::{ArgKind, InstKind, Instruction, IsaContext, Function, Token};

/// An architecture module: a rule set, a designated root non-terminal, and
/// the pre/post passes spec §4.2 requires.
pub trait Architecture {
    fn name(&self) -> &'static str;
    fn rule_text(&self) -> &'static str;
    fn root_nonterminal(&self) -> &'static str {
        "stmt"
    }
    fn stack_pointer(&self) -> &'static str {
        "sp"
    }

    fn rules(&self) -> RuleSet {
        RuleSet::new(clc_reader::parse_rule_file(self.rule_text()).expect("architecture rule text is well-formed"))
    }

    /// Replaces every `alloca size => %dst` with an `sp`-relative add, and
    /// brackets the function with a stack adjustment sized to the sum of
    /// all allocations.
    fn pre_ir_pass(&self, func: &mut Function, isa: &IsaContext) -> Result<(), SelectError> {
        lower_allocas(func, isa, self.stack_pointer())
    }

    /// Removes unconditional jumps whose sole target is the block that
    /// immediately follows them in layout order.
    fn post_asm_pass(&self, func: &mut Function, isa: &IsaContext) -> Result<(), SelectError> {
        drop_fallthrough_jumps(func, isa)
    }
}

fn lower_allocas(func: &mut Function, isa: &IsaContext, sp: &str) -> Result<(), SelectError> {
    let mut frame_size: i64 = 0;
    for &b in func.block_order().to_vec().iter() {
        let mut rewritten = Vec::with_capacity(func.block(b).insts.len());
        for inst in func.block(b).insts.iter().cloned() {
            if inst.opcode == "alloca" {
                let Some(Token::Const(size)) = inst.args.first() else {
                    return Err(SelectError::BadPlaceholder("alloca missing a size operand".into()));
                };
                let dst = inst.args.get(1).and_then(Token::as_reg).ok_or_else(|| {
                    SelectError::BadPlaceholder("alloca missing a destination register".into())
                })?;
                let offset = frame_size;
                frame_size += align4(*size);
                rewritten.push(Instruction::new(
                    "add",
                    vec![Token::Reg(sp.to_string()), Token::Const(offset), Token::Reg(dst.to_string())],
                ));
            } else {
                rewritten.push(inst);
            }
        }
        func.block_mut(b).insts = rewritten;
    }

    if frame_size == 0 {
        return Ok(());
    }

    if let Some(entry) = func.entry() {
        let mut insts = std::mem::take(&mut func.block_mut(entry).insts);
        insts.insert(0, adjust_sp(sp, -frame_size));
        func.block_mut(entry).insts = insts;
    }

    for &b in func.block_order().to_vec().iter() {
        let is_ret = func.block(b).terminator().map(|t| t.kind(isa)).transpose()?.map(|k| k == InstKind::Return).unwrap_or(false);
        if is_ret {
            let idx = func.block(b).insts.len() - 1;
            func.block_mut(b).insts.insert(idx, adjust_sp(sp, frame_size));
        }
    }
    Ok(())
}

fn adjust_sp(sp: &str, delta: i64) -> Instruction {
    Instruction::new("adjust_sp", vec![Token::Reg(sp.to_string()), Token::Const(delta)])
}

fn align4(size: i64) -> i64 {
    (size + 3) & !3
}

fn drop_fallthrough_jumps(func: &mut Function, isa: &IsaContext) -> Result<(), SelectError> {
    let order = func.block_order().to_vec();
    for (i, &b) in order.iter().enumerate() {
        let Some(next) = order.get(i + 1).map(|&n| func.block(n).name.clone()) else { continue };
        let drop = match func.block(b).terminator() {
            Some(t) if t.opcode == "jmp" && t.kind(isa)? == InstKind::Branch => {
                t.branch_targets(isa)?.as_slice() == [next.as_str()]
            }
            _ => false,
        };
        if drop {
            func.block_mut(b).insts.pop();
        }
    }
    Ok(())
}

/// A 64-bit-register-window architecture: three-address arithmetic, one
/// addressing mode, a two-register-plus-immediate `add`.
pub struct Generic64;

impl Architecture for Generic64 {
    fn name(&self) -> &'static str {
        "generic64"
    }

    fn rule_text(&self) -> &'static str {
        "\
reg ; __reg__ ; 0 ; set($.D, $0.name)
reg ; __const__ ; 1 ; set($.D, $0)
reg ; add(reg, reg) ; 1 ; emit(add, $.D, $0.D, $1.D)
reg ; mult(reg, reg) ; 3 ; emit(mult, $.D, $0.D, $1.D)
reg ; loadAI(reg, reg) ; 2 ; emit(loadAI, $.D, $0.D, $1.D)
stmt ; reg ; 0 ;
stmt ; store(reg, reg) ; 1 ; emit(store, $0.D, $1.D)
stmt ; ret(reg) ; 1 ; emit(ret, $0.D)
stmt ; ret() ; 1 ; emit(ret)
stmt ; jmp(__block__) ; 1 ; emit(jmp, $0.name)
"
    }
}

/// A load/store register-machine architecture: no memory operands on ALU
/// ops, a dedicated `loadAI`/`store` pair, and a cheaper immediate move.
pub struct GenericRisc;

impl Architecture for GenericRisc {
    fn name(&self) -> &'static str {
        "generic-risc"
    }

    fn rule_text(&self) -> &'static str {
        "\
reg ; __reg__ ; 0 ; set($.D, $0.name)
reg ; __const__ ; 0 ; set($.D, $0)
reg ; add(reg, reg) ; 1 ; emit(add, $.D, $0.D, $1.D)
reg ; mult(reg, reg) ; 4 ; emit(mult, $.D, $0.D, $1.D)
reg ; loadAI(reg, reg) ; 3 ; emit(loadAI, $.D, $0.D, $1.D)
stmt ; reg ; 0 ;
stmt ; store(reg, reg) ; 1 ; emit(store, $0.D, $1.D)
stmt ; ret(reg) ; 1 ; emit(ret, $0.D)
stmt ; ret() ; 1 ; emit(ret)
stmt ; jmp(__block__) ; 1 ; emit(jmp, $0.name)
"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::{ArgKind as AK, InstKind as IK};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("alloca", IK::Normal, vec![AK::Const, AK::RegDef]);
        isa.define("add", IK::Normal, vec![AK::RegUse, AK::Const, AK::RegDef]);
        isa.define("ret", IK::Return, vec![]);
        isa.define("jmp", IK::Branch, vec![AK::BlockLabel]);
        isa.reserve_register("sp");
        isa
    }

    #[test]
    fn alloca_becomes_sp_relative_add_with_frame_adjustment() {
        let mut f = Function::new("f", vec![]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new("alloca", vec![Token::Const(8), Token::Reg("p".into())]));
        f.block_mut(b0).push(Instruction::new("ret", vec![]));

        Generic64.pre_ir_pass(&mut f, &isa()).unwrap();

        let insts = &f.block(b0).insts;
        assert_eq!(insts[0].opcode, "adjust_sp");
        assert_eq!(insts[1].opcode, "add");
        assert_eq!(insts[1].args[2], Token::Reg("p".into()));
        assert_eq!(insts[2].opcode, "adjust_sp");
        assert_eq!(insts[3].opcode, "ret");
    }

    #[test]
    fn fallthrough_jump_is_dropped() {
        let mut f = Function::new("f", vec![]);
        let b0 = f.push_block("b0");
        let b1 = f.push_block("b1");
        f.block_mut(b0).push(Instruction::new("jmp", vec![Token::Label("b1".into())]));
        f.block_mut(b1).push(Instruction::new("ret", vec![]));

        Generic64.post_asm_pass(&mut f, &isa()).unwrap();
        assert!(f.block(b0).insts.is_empty());
    }
}
