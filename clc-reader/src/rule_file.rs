//! The BURS rule file (spec §6, §4.2): `lhs ; rhs ; cost ; code`, where
//! `rhs` is either a bare non-terminal name (a chain rule) or
//! `op(arg1, arg2, ...)` with nested operators allowed. The parser
//! flattens nested operators by synthesizing fresh intermediate
//! non-terminals, so every [`FlatRule`] this module hands back has a
//! right-hand side that is either a single non-terminal or one operator
//! applied to non-terminal children — exactly the shape the matcher in
//! `clc-codegen` needs.

use crate::error::{err, Location, ParseResult};
use crate::lex::preprocess;

/// One operation in a rule's action code: either `set(dst, src)` or
/// `emit(op, args...)`. The placeholder grammar (`$0`, `$.D`, `.val`, ...)
/// is interpreted later, by the rewriter — this stage only tokenizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawOp {
    pub name: String,
    pub args: Vec<String>,
}

/// A flattened right-hand side: either a chain to another non-terminal, or
/// an operator with non-terminal children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rhs {
    Chain(String),
    Op(String, Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatRule {
    pub lhs: String,
    pub rhs: Rhs,
    pub cost: i64,
    pub code: Vec<RawOp>,
}

enum RhsTerm {
    NonTerminal(String),
    Op(String, Vec<RhsTerm>),
}

pub fn parse_rule_file(text: &str) -> ParseResult<Vec<FlatRule>> {
    let mut out = Vec::new();
    let mut synth_counter = 0u32;

    for (ln, content) in preprocess(text) {
        let loc = Location::new(ln);
        let fields: Vec<&str> = content.split(';').map(str::trim).collect();
        if fields.len() != 4 {
            return err!(loc, "expected `lhs ; rhs ; cost ; code`, found {} field(s)", fields.len());
        }
        let [lhs, rhs_str, cost_str, code_str] = fields.as_slice() else { unreachable!() };
        let (lhs, rhs_str, cost_str, code_str) = (*lhs, *rhs_str, *cost_str, *code_str);
        if lhs.is_empty() {
            return err!(loc, "rule is missing a left-hand-side non-terminal");
        }
        let cost: i64 = cost_str
            .parse()
            .map_err(|_| crate::error::ParseError { location: loc, message: format!("`{}` is not an integer cost", cost_str) })?;
        let term = parse_rhs_term(rhs_str, loc)?;
        let code = parse_code(code_str, loc)?;

        let rhs = match term {
            RhsTerm::NonTerminal(nt) => Rhs::Chain(nt),
            RhsTerm::Op(op, children) => {
                let child_nts = children.into_iter().map(|c| flatten(c, &mut synth_counter, &mut out)).collect();
                Rhs::Op(op, child_nts)
            }
        };
        out.push(FlatRule { lhs: lhs.to_string(), rhs, cost, code });
    }
    Ok(out)
}

/// Recursively flattens a right-hand-side term to a single non-terminal
/// name, synthesizing a fresh structural rule (cost 0, no action code) for
/// every nested operator it encounters.
fn flatten(term: RhsTerm, counter: &mut u32, out: &mut Vec<FlatRule>) -> String {
    match term {
        RhsTerm::NonTerminal(nt) => nt,
        RhsTerm::Op(op, children) => {
            let child_nts = children.into_iter().map(|c| flatten(c, counter, out)).collect();
            *counter += 1;
            let synth_lhs = format!("__syn{counter}");
            out.push(FlatRule { lhs: synth_lhs.clone(), rhs: Rhs::Op(op, child_nts), cost: 0, code: Vec::new() });
            synth_lhs
        }
    }
}

fn parse_rhs_term(s: &str, loc: Location) -> ParseResult<RhsTerm> {
    let s = s.trim();
    if s.is_empty() {
        return err!(loc, "rule is missing a right-hand side");
    }
    match s.find('(') {
        None => Ok(RhsTerm::NonTerminal(s.to_string())),
        Some(paren) => {
            let Some(closing) = s.rfind(')') else {
                return err!(loc, "unbalanced parentheses in `{}`", s);
            };
            if closing < paren {
                return err!(loc, "unbalanced parentheses in `{}`", s);
            }
            let op = s[..paren].trim().to_string();
            let inner = &s[paren + 1..closing];
            let mut children = Vec::new();
            for part in split_top_level_commas(inner) {
                children.push(parse_rhs_term(&part, loc)?);
            }
            if children.is_empty() {
                return err!(loc, "operator `{}` has no children", op);
            }
            Ok(RhsTerm::Op(op, children))
        }
    }
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                out.push(s[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim().to_string());
    out
}

fn parse_code(s: &str, loc: Location) -> ParseResult<Vec<RawOp>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split('|').map(|op_str| parse_op(op_str.trim(), loc)).collect()
}

fn parse_op(s: &str, loc: Location) -> ParseResult<RawOp> {
    let Some(paren) = s.find('(') else {
        return err!(loc, "expected `name(args...)`, found `{}`", s);
    };
    let Some(closing) = s.rfind(')') else {
        return err!(loc, "unbalanced parentheses in `{}`", s);
    };
    let name = s[..paren].trim().to_string();
    let args = split_top_level_commas(&s[paren + 1..closing]).into_iter().filter(|a| !a.is_empty()).collect();
    Ok(RawOp { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s2_rule_set() {
        let text = "\
reg ; add(reg, reg) ; 1 ; emit(add, $.D, $0.D, $1.D)
reg ; __const__x ; 1 ; set($.D, $0)
reg ; __reg__ ; 0 ; set($.D, $0.name)
";
        let rules = parse_rule_file(text).unwrap();
        assert_eq!(rules.len(), 3);
        assert!(matches!(&rules[0].rhs, Rhs::Op(op, kids) if op == "add" && kids == &["reg", "reg"]));
        assert_eq!(rules[0].cost, 1);
        assert_eq!(rules[0].code[0].name, "emit");
    }

    #[test]
    fn flattens_nested_operators() {
        let text = "reg ; add(reg, mult(reg, reg)) ; 2 ; emit(add, $.D, $0.D, $1.D)\n";
        let rules = parse_rule_file(text).unwrap();
        // one rule for `reg`, one synthesized rule for the nested `mult`.
        assert_eq!(rules.len(), 2);
        let top = rules.iter().find(|r| r.lhs == "reg").unwrap();
        let Rhs::Op(op, kids) = &top.rhs else { panic!("expected an operator rhs") };
        assert_eq!(op, "add");
        assert_eq!(kids[0], "reg");
        let synth = rules.iter().find(|r| &r.lhs == &kids[1]).unwrap();
        assert!(matches!(&synth.rhs, Rhs::Op(op, kids) if op == "mult" && kids == &["reg", "reg"]));
        assert_eq!(synth.cost, 0);
    }

    #[test]
    fn chain_rule_has_no_operator() {
        let text = "addr ; reg ; 0 ; \n";
        let rules = parse_rule_file(text).unwrap();
        assert!(matches!(&rules[0].rhs, Rhs::Chain(nt) if nt == "reg"));
    }
}
