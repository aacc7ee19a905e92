//! Spill-slot insertion (spec §4.3 "Spilling"): every use gets a freshly
//! named live range loaded immediately before it (uses within one
//! instruction share a single load), every def gets a fresh live range
//! stored immediately after it, and the spill slot itself is a
//! 4-byte-aligned `sp`-relative offset past every offset already in use in
//! the function.

use super::error::AllocError;
use clc_ir::{ArgKind, Function, Instruction, IsaContext, Token};

const SLOT_SIZE: i64 = 4;

/// Rewrites every reference to `victim` into fresh live ranges backed by one
/// stack slot, and returns the id of the next unused fresh live range
/// (`next_id..` are now live range names `lr{id}` in `func`).
pub fn spill(
    func: &mut Function,
    isa: &IsaContext,
    sp: &str,
    victim: &str,
    next_id: usize,
) -> Result<usize, AllocError> {
    let offset = next_spill_offset(func, isa, sp)?;
    let mut fresh = next_id;

    for &b in func.block_order().to_vec().iter() {
        let mut rewritten = Vec::with_capacity(func.block(b).insts.len());
        for inst in func.block(b).insts.iter().cloned() {
            let uses_victim = inst.uses(isa)?.iter().any(|&u| u == victim);
            let defs_victim = inst.defs(isa)?.iter().any(|&d| d == victim);

            if !uses_victim && !defs_victim {
                rewritten.push(inst);
                continue;
            }

            let mut inst = inst;
            let spec = isa.lookup(&inst.opcode).ok_or_else(|| AllocError::UnknownOpcode(inst.opcode.clone()))?.clone();

            if uses_victim {
                let load_into = format!("lr{fresh}");
                fresh += 1;
                rewritten.push(Instruction::new(
                    "loadAI",
                    vec![Token::Reg(sp.to_string()), Token::Const(offset), Token::Reg(load_into.clone())],
                ));
                for (i, tok) in inst.args.iter_mut().enumerate() {
                    let is_use = matches!(spec.arg_kind_at(i), Some(ArgKind::RegUse | ArgKind::UseDef));
                    if is_use && matches!(tok, Token::Reg(r) if r == victim) {
                        *tok = Token::Reg(load_into.clone());
                    }
                }
            }

            if defs_victim {
                let def_into = format!("lr{fresh}");
                fresh += 1;
                for (i, tok) in inst.args.iter_mut().enumerate() {
                    let is_def = matches!(spec.arg_kind_at(i), Some(ArgKind::RegDef | ArgKind::UseDef));
                    if is_def && matches!(tok, Token::Reg(r) if r == victim) {
                        *tok = Token::Reg(def_into.clone());
                    }
                }
                rewritten.push(inst);
                rewritten.push(Instruction::new(
                    "store",
                    vec![Token::Reg(sp.to_string()), Token::Const(offset), Token::Reg(def_into)],
                ));
            } else {
                rewritten.push(inst);
            }
        }
        func.block_mut(b).insts = rewritten;
    }

    Ok(fresh)
}

/// The first unused, 4-byte-aligned `sp`-relative offset in `func` — where
/// the local allocator's own spill slots should start, and what `spill`
/// recomputes before each fresh slot it hands out.
pub fn next_spill_base(func: &Function, isa: &IsaContext, sp: &str) -> Result<i64, AllocError> {
    next_spill_offset(func, isa, sp)
}

fn next_spill_offset(func: &Function, isa: &IsaContext, sp: &str) -> Result<i64, AllocError> {
    let mut highest: i64 = -SLOT_SIZE;
    for (_, data) in func.blocks() {
        for inst in &data.insts {
            if (inst.is_load() || inst.is_store()) && inst.uses(isa)?.first() == Some(&sp) {
                if let Some(Token::Const(off)) = inst.args.get(1) {
                    highest = highest.max(*off);
                }
            }
        }
    }
    Ok(highest + SLOT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::{ArgKind, InstKind};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa.define("loadAI", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::Const, ArgKind::RegDef]);
        isa.define("store", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::Const, ArgKind::RegUse]);
        isa.reserve_register("sp");
        isa
    }

    #[test]
    fn use_gets_a_load_and_def_gets_a_store() {
        let mut f = Function::new("f", vec![]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(Instruction::new(
            "add",
            vec![Token::Reg("lr0".into()), Token::Reg("lr1".into()), Token::Reg("lr1".into())],
        ));
        f.block_mut(b0).push(Instruction::new("ret", vec![Token::Reg("lr1".into())]));

        let isa = isa();
        let next = spill(&mut f, &isa, "sp", "lr1", 2).unwrap();
        assert_eq!(next, 5); // used once (load) and defined once (store) in the add, then used again in ret

        let insts = &f.block(b0).insts;
        assert_eq!(insts[0].opcode, "loadAI");
        assert_eq!(insts[1].opcode, "add");
        assert_eq!(insts[2].opcode, "store");
        assert_eq!(insts[3].opcode, "loadAI");
        assert_eq!(insts[4].opcode, "ret");
    }
}
