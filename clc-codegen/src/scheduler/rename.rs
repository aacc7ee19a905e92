//! SSA-like renaming pre-pass (spec §4.1 "Pre-pass"): for each definition
//! whose name does not survive to the end of its block, give it a fresh
//! name and rename the uses that consume it, stopping at the next
//! redefinition. This removes all anti-dependences not carried by loop
//! back-edges, so the scheduler sees a near-maximal amount of independent
//! work.

use clc_analyses::Liveness;
use clc_ir::{ArgKind, Function, IsaContext, Token, UnknownOpcode};

pub fn rename_function(func: &mut Function, isa: &IsaContext, live: &Liveness) -> Result<(), UnknownOpcode> {
    let mut counter = 0u32;
    let blocks = func.block_order().to_vec();
    for b in blocks {
        let live_out = live.live_out(b).clone();
        let mut insts = func.block(b).insts.clone();

        for j in 0..insts.len() {
            let spec = match isa.lookup(&insts[j].opcode) {
                Some(s) => s.clone(),
                None => return Err(UnknownOpcode(insts[j].opcode.clone())),
            };
            let def_positions: Vec<usize> = (0..insts[j].args.len())
                .filter(|&p| matches!(spec.arg_kind_at(p), Some(ArgKind::RegDef | ArgKind::UseDef)))
                .collect();

            for pos in def_positions {
                let old_name = match insts[j].args[pos].as_reg() {
                    Some(r) => r.to_string(),
                    None => continue,
                };
                if live_out.contains(&old_name) {
                    continue;
                }
                let new_name = format!("{old_name}.s{counter}");
                counter += 1;
                insts[j].args[pos] = Token::Reg(new_name.clone());

                'scan: for k in j + 1..insts.len() {
                    let kspec = match isa.lookup(&insts[k].opcode) {
                        Some(s) => s.clone(),
                        None => return Err(UnknownOpcode(insts[k].opcode.clone())),
                    };
                    let mut redefined = false;
                    for argi in 0..insts[k].args.len() {
                        let kind = kspec.arg_kind_at(argi);
                        let is_old = matches!(&insts[k].args[argi], Token::Reg(r) if *r == old_name);
                        if !is_old {
                            continue;
                        }
                        match kind {
                            Some(ArgKind::RegUse) => insts[k].args[argi] = Token::Reg(new_name.clone()),
                            Some(ArgKind::UseDef) => {
                                insts[k].args[argi] = Token::Reg(new_name.clone());
                                redefined = true;
                            }
                            Some(ArgKind::RegDef) => redefined = true,
                            _ => {}
                        }
                    }
                    if redefined {
                        break 'scan;
                    }
                }
            }
        }

        func.block_mut(b).insts = insts;
    }
    Ok(())
}
