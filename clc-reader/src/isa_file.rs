//! The ISA description file (spec §6): `@ins <kind> <opname> <argspec>*`.

use crate::error::{err, Location, ParseResult};
use crate::lex::preprocess;
use clc_ir::{ArgKind, InstKind, IsaContext};

pub fn parse_isa_file(text: &str) -> ParseResult<IsaContext> {
    let mut isa = IsaContext::new();
    for (ln, content) in preprocess(text) {
        let loc = Location::new(ln);
        let mut tokens = content.split_whitespace();
        let head = tokens.next().unwrap_or("");
        if head != "@ins" {
            return err!(loc, "expected `@ins`, found `{}`", head);
        }
        let Some(kind_tok) = tokens.next() else {
            return err!(loc, "`@ins` is missing a kind");
        };
        let kind = match kind_tok {
            "call" => InstKind::Call,
            "ret" => InstKind::Return,
            "branch" => InstKind::Branch,
            "normal" => InstKind::Normal,
            other => return err!(loc, "unknown instruction kind `{}`", other),
        };
        let Some(opname) = tokens.next() else {
            return err!(loc, "`@ins` is missing an opcode name");
        };
        let mut args = Vec::new();
        for spec in tokens {
            // A `|`-joined subset of roles is accepted for a single
            // position; this teaching ISA resolves it to its first
            // (most specific) alternative rather than modeling true
            // operand overloading.
            let first = spec.split('|').next().unwrap_or(spec);
            let kind = match first {
                "r" | "u" => ArgKind::RegUse,
                "d" => ArgKind::RegDef,
                "x" => ArgKind::UseDef,
                "c" => ArgKind::Const,
                "b" => ArgKind::BlockLabel,
                "f" => ArgKind::FuncLabel,
                "*" => ArgKind::Repeat,
                other => return err!(loc, "unknown argspec token `{}`", other),
            };
            args.push(kind);
        }
        isa.define(opname, kind, args);
    }
    Ok(isa)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_isa_file() {
        let text = "\
; comment
@ins normal loadAI r|c d
@ins normal add r r d
@ins ret ret
@ins branch br b
";
        let isa = parse_isa_file(text).unwrap();
        let load = isa.lookup("loadAI").unwrap();
        assert!(matches!(load.arg_kind_at(0), Some(ArgKind::RegUse)));
        assert!(matches!(load.arg_kind_at(1), Some(ArgKind::Const)));
        assert!(matches!(load.arg_kind_at(2), Some(ArgKind::RegDef)));
        assert_eq!(isa.lookup("ret").unwrap().kind, InstKind::Return);
    }
}
