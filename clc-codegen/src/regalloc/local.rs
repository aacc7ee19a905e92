//! The simpler local variant (spec §4.3 "Simpler local variant"): used for
//! a single-block function, no coalescing or interference graph required.
//! A resident-register table is walked instruction by instruction; when a
//! new value needs a register and none is free, the farthest-next-use
//! resident is spilled (also the subject of spec §9 Open Question 3,
//! resolved in `DESIGN.md`). A `mov` whose source register dies at that
//! instruction reuses the source's hardware register for the destination
//! and is dropped, rather than emitting a real move.

use super::error::AllocError;
use clc_ir::{ArgKind, BasicBlockData, Instruction, IsaContext, Token};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    InRegister(usize),
    Spilled(i64),
}

struct Ctx<'a> {
    isa: &'a IsaContext,
    sp: &'a str,
    state: FxHashMap<String, State>,
    free: Vec<usize>,
    next_slot: i64,
    uses_after: FxHashMap<String, Vec<usize>>,
    out: Vec<Instruction>,
}

impl<'a> Ctx<'a> {
    fn next_use(&self, r: &str, idx: usize) -> usize {
        self.uses_after
            .get(r)
            .and_then(|v| v.iter().copied().find(|&u| u > idx))
            .unwrap_or(usize::MAX)
    }

    fn fresh_slot(&mut self) -> i64 {
        let slot = self.next_slot;
        self.next_slot += 4;
        slot
    }

    /// Frees a hardware register by spilling its current resident to a
    /// fresh slot, or discarding it outright if it is never used again.
    fn allocate_register(&mut self, idx: usize) -> Result<usize, AllocError> {
        if let Some(hr) = self.free.pop() {
            return Ok(hr);
        }
        let victim = self
            .state
            .iter()
            .filter_map(|(name, s)| match s {
                State::InRegister(hr) => Some((name.clone(), *hr, self.next_use(name, idx))),
                State::Spilled(_) => None,
            })
            .max_by_key(|&(_, _, next)| next);

        let (name, hr, next) = victim.ok_or(AllocError::NotConverging { function: String::new(), attempts: 0 })?;
        self.state.remove(&name);
        if next != usize::MAX {
            let offset = self.fresh_slot();
            self.out.push(Instruction::new(
                "store",
                vec![Token::Reg(self.sp.to_string()), Token::Const(offset), Token::Reg(format!("hr{hr}"))],
            ));
            self.state.insert(name, State::Spilled(offset));
        }
        Ok(hr)
    }

    /// Ensures `r` is resident in a hardware register, emitting a reload if
    /// it was spilled, and returns that register's index.
    fn ensure_resident(&mut self, r: &str, idx: usize) -> Result<usize, AllocError> {
        match self.state.get(r).copied() {
            Some(State::InRegister(hr)) => Ok(hr),
            Some(State::Spilled(offset)) => {
                let hr = self.allocate_register(idx)?;
                self.out.push(Instruction::new(
                    "loadAI",
                    vec![Token::Reg(self.sp.to_string()), Token::Const(offset), Token::Reg(format!("hr{hr}"))],
                ));
                self.state.insert(r.to_string(), State::InRegister(hr));
                Ok(hr)
            }
            None => {
                // Live into the block (a function argument); treat as
                // already resident on first reference.
                let hr = self.allocate_register(idx)?;
                self.state.insert(r.to_string(), State::InRegister(hr));
                Ok(hr)
            }
        }
    }

    /// Drops any resident whose last use was at or before `idx`, freeing
    /// its hardware register for reuse by this instruction's defs.
    fn expire(&mut self, idx: usize) {
        let dead: Vec<(String, usize)> = self
            .state
            .iter()
            .filter_map(|(name, s)| match s {
                State::InRegister(hr) if self.next_use(name, idx) == usize::MAX => Some((name.clone(), *hr)),
                _ => None,
            })
            .collect();
        for (name, hr) in dead {
            self.state.remove(&name);
            self.free.push(hr);
        }
    }
}

/// Allocates one single-block function body in place against `k` hardware
/// registers named `hr0..hrk-1`, plus `sp`-relative spill slots starting at
/// `spill_base`.
pub fn allocate_block(block: &mut BasicBlockData, isa: &IsaContext, sp: &str, k: usize, spill_base: i64) -> Result<(), AllocError> {
    let mut uses_after: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, inst) in block.insts.iter().enumerate() {
        for u in inst.uses(isa)? {
            uses_after.entry(u.to_string()).or_default().push(idx);
        }
    }

    let mut ctx = Ctx {
        isa,
        sp,
        state: FxHashMap::default(),
        free: (0..k).collect(),
        next_slot: spill_base,
        uses_after,
        out: Vec::with_capacity(block.insts.len()),
    };

    for idx in 0..block.insts.len() {
        let inst = block.insts[idx].clone();
        let spec = isa.lookup(&inst.opcode).ok_or_else(|| AllocError::UnknownOpcode(inst.opcode.clone()))?.clone();

        if let Some((dst, src)) = inst.as_mov() {
            if src != sp && !isa.is_reserved(src) {
                let src_hr = ctx.ensure_resident(src, idx)?;
                if ctx.next_use(src, idx) == usize::MAX {
                    ctx.state.remove(src);
                    ctx.state.insert(dst.to_string(), State::InRegister(src_hr));
                    continue;
                }
                ctx.expire(idx);
                let dst_hr = ctx.allocate_register(idx)?;
                ctx.state.insert(dst.to_string(), State::InRegister(dst_hr));
                ctx.out.push(Instruction::new(
                    "mov",
                    vec![Token::Reg(format!("hr{dst_hr}")), Token::Reg(format!("hr{src_hr}"))],
                ));
                continue;
            }
        }

        let mut rewritten = inst.clone();
        for (i, tok) in rewritten.args.iter_mut().enumerate() {
            let Token::Reg(r) = tok else { continue };
            if r == sp || isa.is_reserved(r) {
                continue;
            }
            if matches!(spec.arg_kind_at(i), Some(ArgKind::RegUse | ArgKind::UseDef)) {
                let hr = ctx.ensure_resident(r, idx)?;
                *r = format!("hr{hr}");
            }
        }

        ctx.expire(idx);

        for (i, tok) in rewritten.args.iter_mut().enumerate() {
            let Token::Reg(r) = tok else { continue };
            if r == sp || isa.is_reserved(r) {
                continue;
            }
            if matches!(spec.arg_kind_at(i), Some(ArgKind::RegDef | ArgKind::UseDef)) {
                let hr = ctx.allocate_register(idx)?;
                ctx.state.insert(r.clone(), State::InRegister(hr));
                *r = format!("hr{hr}");
            }
        }

        ctx.out.push(rewritten);
    }

    block.insts = ctx.out;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::InstKind;

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("mov", InstKind::Normal, vec![ArgKind::RegDef, ArgKind::RegUse]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa.reserve_register("sp");
        isa
    }

    #[test]
    fn dying_mov_source_register_is_reused_and_the_mov_is_dropped() {
        let isa = isa();
        let mut block = BasicBlockData::new("b0");
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("a".into()), Token::Reg("b".into()), Token::Reg("t".into())],
        ));
        block.push(Instruction::new("mov", vec![Token::Reg("u".into()), Token::Reg("t".into())]));
        block.push(Instruction::new("ret", vec![Token::Reg("u".into())]));

        allocate_block(&mut block, &isa, "sp", 4, 0).unwrap();
        assert!(!block.insts.iter().any(|i| i.opcode == "mov"));
        let add_dst = block.insts[0].args[2].as_reg().unwrap().to_string();
        let ret_src = block.insts.last().unwrap().args[0].as_reg().unwrap();
        assert_eq!(add_dst, ret_src);
    }

    #[test]
    fn spills_the_farthest_next_use_when_registers_run_out() {
        let isa = isa();
        let mut block = BasicBlockData::new("b0");
        // a and b are both still needed when c is computed: three
        // simultaneously live values through only two hardware registers.
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("p0".into()), Token::Reg("p1".into()), Token::Reg("a".into())],
        ));
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("p2".into()), Token::Reg("p3".into()), Token::Reg("b".into())],
        ));
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("p4".into()), Token::Reg("p5".into()), Token::Reg("c".into())],
        ));
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("a".into()), Token::Reg("b".into()), Token::Reg("t".into())],
        ));
        block.push(Instruction::new(
            "add",
            vec![Token::Reg("t".into()), Token::Reg("c".into()), Token::Reg("u".into())],
        ));
        block.push(Instruction::new("ret", vec![Token::Reg("u".into())]));

        allocate_block(&mut block, &isa, "sp", 2, 0).unwrap();
        assert!(block.insts.iter().any(|i| i.opcode == "store"));
        assert!(block.insts.iter().any(|i| i.opcode == "loadAI"));
    }
}
