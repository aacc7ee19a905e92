//! The textual IR reader/writer (spec §6): `.fun` directives, block labels,
//! `opcode arg, arg, ... => def, def, ...` instruction lines.

use crate::error::{err, Location, ParseResult};
use crate::lex::{bare_label, preprocess, split_args};
use clc_ir::{Function, Instruction, IsaContext, Module, Token};

pub fn parse_module(text: &str, isa: IsaContext) -> ParseResult<Module> {
    let lines = preprocess(text);
    let mut module = Module::new(isa);
    let mut idx = 0usize;

    while idx < lines.len() {
        let (ln, content) = &lines[idx];
        let loc = Location::new(*ln);
        let Some(fname) = bare_label(content) else {
            return err!(loc, "expected a function label, found `{}`", content);
        };
        let fname = fname.to_string();
        idx += 1;

        let Some((ln2, content2)) = lines.get(idx) else {
            return err!(loc, "expected `.fun` directive after label `{}:`", fname);
        };
        if !content2.starts_with(".fun") {
            return err!(Location::new(*ln2), "expected `.fun` directive, found `{}`", content2);
        }
        let (def_name, params) = parse_fun_directive(content2, Location::new(*ln2))?;
        if def_name != fname {
            return err!(
                Location::new(*ln2),
                "`.fun` names function `{}` but the preceding label was `{}:`",
                def_name,
                fname
            );
        }
        idx += 1;

        let mut func = Function::new(fname, params);
        let mut current_block = None;

        while idx < lines.len() {
            let (ln3, content3) = &lines[idx];
            if let Some(bname) = bare_label(content3) {
                // A label immediately followed by `.fun` starts the next function.
                if lines.get(idx + 1).map_or(false, |(_, c)| c.starts_with(".fun")) {
                    break;
                }
                current_block = Some(func.push_block(bname));
                idx += 1;
                continue;
            }

            let Some(block) = current_block else {
                return err!(Location::new(*ln3), "instruction `{}` outside of any block", content3);
            };
            let inst = parse_instruction_line(content3, Location::new(*ln3))?;
            func.block_mut(block).push(inst);
            idx += 1;
        }

        module.push_function(func);
    }

    Ok(module)
}

fn parse_fun_directive(line: &str, loc: Location) -> ParseResult<(String, Vec<String>)> {
    let rest = line[".fun".len()..].trim();
    let mut parts = rest.splitn(2, ',');
    let name = parts.next().unwrap_or("").trim();
    if name.is_empty() {
        return err!(loc, "`.fun` directive is missing a function name");
    }
    let params = match parts.next() {
        Some(p) => split_args(p)
            .into_iter()
            .map(|a| parse_reg_token(&a, loc))
            .collect::<ParseResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok((name.to_string(), params))
}

fn parse_reg_token(tok: &str, loc: Location) -> ParseResult<String> {
    match tok.strip_prefix('%') {
        Some(name) => Ok(name.to_string()),
        None => err!(loc, "expected a `%register` argument, found `{}`", tok),
    }
}

fn parse_instruction_line(line: &str, loc: Location) -> ParseResult<Instruction> {
    let mut it = line.splitn(2, char::is_whitespace);
    let opcode = it.next().unwrap_or("").trim();
    if opcode.is_empty() {
        return err!(loc, "empty instruction line");
    }
    let rest = it.next().unwrap_or("");
    let args = split_args(rest)
        .into_iter()
        .map(|tok| parse_token(&tok, loc))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(Instruction::new(opcode, args))
}

fn parse_token(tok: &str, loc: Location) -> ParseResult<Token> {
    if let Some(name) = tok.strip_prefix('%') {
        Ok(Token::Reg(name.to_string()))
    } else if let Some(name) = tok.strip_prefix('@') {
        Ok(Token::Label(name.to_string()))
    } else {
        tok.parse::<i64>()
            .map(Token::Const)
            .or_else(|_| err!(loc, "expected a `%register`, `@label` or integer literal, found `{}`", tok))
    }
}

/// Emits the textual IR for `module`, the inverse of [`parse_module`].
/// `Parse(emit(M)) = M` for any valid `M` (spec §8): every token we print is
/// exactly one we're willing to re-lex the same way.
pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    for func in module.functions() {
        out.push_str(&func.name);
        out.push_str(":\n");
        out.push_str(".fun ");
        out.push_str(&func.name);
        for p in &func.params {
            out.push_str(", %");
            out.push_str(p);
        }
        out.push('\n');
        for (_, block) in func.blocks() {
            out.push_str(&block.name);
            out.push_str(":\n");
            for inst in &block.insts {
                out.push_str("    ");
                out.push_str(&emit_instruction(inst, &module.isa));
                out.push('\n');
            }
        }
    }
    out
}

fn emit_instruction(inst: &Instruction, isa: &IsaContext) -> String {
    let first_def = isa
        .lookup(&inst.opcode)
        .map(|spec| {
            (0..inst.args.len())
                .find(|&i| matches!(spec.arg_kind_at(i), Some(clc_ir::ArgKind::RegDef | clc_ir::ArgKind::UseDef)))
        })
        .unwrap_or(None);

    let mut s = inst.opcode.clone();
    for (i, a) in inst.args.iter().enumerate() {
        if i == 0 {
            s.push(' ');
        } else if Some(i) == first_def {
            s.push_str(" =>");
            s.push(' ');
        } else {
            s.push_str(", ");
        }
        s.push_str(&a.to_string());
    }
    s
}
