//! Top-down rewriting (spec §4.2 "Rewriting"): walk the cheapest-rule chain
//! recorded by the matcher, outer chain rules first, executing each rule's
//! action ops. `set` rebinds a node's `.D` symbolically; `emit` appends a
//! real target instruction.

use super::error::SelectError;
use super::forest::{Forest, NodeId, NodeKind};
use super::matcher::Matching;
use super::rules::RuleSet;
use clc_ir::{Instruction, Token};
use clc_reader::{RawOp, Rhs};
use rustc_hash::FxHashMap;

/// A node's resolved value: either a register name or a literal constant.
/// Both are valid operands for an emitted instruction, and which one a
/// matched sub-tree produced depends entirely on which rule covered it (a
/// `__const__` leaf yields `Const`; everything else yields `Reg`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Reg(String),
    Const(i64),
}

enum Resolved {
    Reg(String),
    Const(i64),
    Literal(String),
}

pub struct Rewriter<'a> {
    forest: &'a Forest,
    rules: &'a RuleSet,
    matching: &'a Matching,
    output: Vec<Instruction>,
    temp_counter: u32,
    d_bindings: FxHashMap<NodeId, Value>,
}

impl<'a> Rewriter<'a> {
    pub fn new(forest: &'a Forest, rules: &'a RuleSet, matching: &'a Matching) -> Self {
        Self { forest, rules, matching, output: Vec::new(), temp_counter: 0, d_bindings: FxHashMap::default() }
    }

    pub fn into_output(self) -> Vec<Instruction> {
        self.output
    }

    fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("%sel{}", self.temp_counter)
    }

    /// Rewrites one forest root against `goal`, the designated root
    /// non-terminal, applying the root-register-reuse optimization (spec
    /// §4.2 "the tree root was an IR Ins with an explicit destination
    /// register, use that exact register instead of a fresh temporary").
    pub fn rewrite_root(&mut self, root: NodeId, goal: &str) -> Result<Value, SelectError> {
        if let NodeKind::Ins { def: Some(d), .. } = &self.forest.nodes[root].kind {
            self.d_bindings.insert(root, Value::Reg(d.clone()));
        }
        self.rewrite(root, goal, true)
    }

    fn rewrite(&mut self, node: NodeId, nt: &str, is_root: bool) -> Result<Value, SelectError> {
        let Some(cover) = self.matching.best(node, nt) else {
            return Err(SelectError::NoCover {
                function: String::new(),
                block: String::new(),
                node,
                nonterminal: nt.to_string(),
            });
        };
        let rule = self.rules.rules[cover.rule].clone();

        match &rule.rhs {
            Rhs::Chain(target) => {
                let (children, values) = if RuleSet::leaf_kind(target).is_some() {
                    (vec![node], vec![self.leaf_self_value(node)?])
                } else {
                    let inner = self.rewrite(node, target, is_root)?;
                    (vec![node], vec![inner])
                };
                self.apply_code(node, &rule.code, &children, &values, is_root)
            }
            Rhs::Op(_, children_nts) => {
                if rule.code.is_empty() {
                    // A synthesized intermediate rule from a flattened nested
                    // operator: it carries no action of its own. The pattern
                    // it sits under is expected to reference it only
                    // structurally, so the best we can do without a deeper
                    // placeholder grammar is preserve the original IR name.
                    let args = match &self.forest.nodes[node].kind {
                        NodeKind::Ins { args, .. } => args.clone(),
                        _ => return Err(SelectError::NoCover { function: String::new(), block: String::new(), node, nonterminal: nt.to_string() }),
                    };
                    for (a, cnt) in args.iter().zip(children_nts.iter()) {
                        self.rewrite(*a, cnt, false)?;
                    }
                    return Ok(self.existing_or_name_value(node));
                }
                let args = match &self.forest.nodes[node].kind {
                    NodeKind::Ins { args, .. } => args.clone(),
                    _ => return Err(SelectError::NoCover { function: String::new(), block: String::new(), node, nonterminal: nt.to_string() }),
                };
                let mut values = Vec::with_capacity(args.len());
                for (a, cnt) in args.iter().zip(children_nts.iter()) {
                    values.push(self.rewrite(*a, cnt, false)?);
                }
                self.apply_code(node, &rule.code, &args, &values, is_root)
            }
        }
    }

    fn existing_or_name_value(&mut self, node: NodeId) -> Value {
        if let Some(v) = self.d_bindings.get(&node) {
            return v.clone();
        }
        let v = match &self.forest.nodes[node].kind {
            NodeKind::Ins { def: Some(d), .. } => Value::Reg(d.clone()),
            _ => Value::Reg(self.fresh_temp()),
        };
        self.d_bindings.insert(node, v.clone());
        v
    }

    fn leaf_self_value(&self, node: NodeId) -> Result<Value, SelectError> {
        Ok(match &self.forest.nodes[node].kind {
            NodeKind::Const(v) => Value::Const(*v),
            NodeKind::Reg(name) => Value::Reg(name.clone()),
            NodeKind::Block(name) => Value::Reg(name.clone()),
            NodeKind::Ins { .. } => {
                return Err(SelectError::BadPlaceholder("leaf rule matched a non-leaf node".into()))
            }
        })
    }

    fn apply_code(
        &mut self,
        node: NodeId,
        code: &[RawOp],
        children: &[NodeId],
        values: &[Value],
        is_root: bool,
    ) -> Result<Value, SelectError> {
        for op in code {
            match op.name.as_str() {
                "set" => {
                    if op.args.len() != 2 || op.args[0] != "$.D" {
                        return Err(SelectError::BadPlaceholder(format!("set({})", op.args.join(", "))));
                    }
                    let v = self.resolve_value(&op.args[1], node, children, values)?;
                    self.d_bindings.insert(node, v);
                }
                "emit" => {
                    let Some((opcode, rest)) = op.args.split_first() else {
                        return Err(SelectError::BadPlaceholder("emit() takes an opcode".into()));
                    };
                    let mut toks = Vec::with_capacity(rest.len());
                    for a in rest {
                        toks.push(match self.resolve_token(a, node, children, values, is_root)? {
                            Resolved::Reg(s) => Token::Reg(s),
                            Resolved::Const(v) => Token::Const(v),
                            Resolved::Literal(l) => Token::Label(l),
                        });
                    }
                    self.output.push(Instruction::new(opcode.clone(), toks));
                }
                other => return Err(SelectError::BadPlaceholder(format!("unknown action `{other}`"))),
            }
        }
        Ok(self.d_bindings.get(&node).cloned().unwrap_or(Value::Reg(self.fresh_temp_for(node))))
    }

    fn fresh_temp_for(&mut self, node: NodeId) -> String {
        let t = self.fresh_temp();
        self.d_bindings.insert(node, Value::Reg(t.clone()));
        t
    }

    /// Resolves a placeholder used as a plain value (the right-hand side of
    /// `set`): `$.D` reads (and lazily binds) this node's own binding, `$N`
    /// forms read a child.
    fn resolve_value(&mut self, raw: &str, node: NodeId, children: &[NodeId], values: &[Value]) -> Result<Value, SelectError> {
        match self.resolve_token(raw, node, children, values, false)? {
            Resolved::Reg(s) => Ok(Value::Reg(s)),
            Resolved::Const(v) => Ok(Value::Const(v)),
            Resolved::Literal(s) => Ok(Value::Reg(s)),
        }
    }

    fn resolve_token(
        &mut self,
        raw: &str,
        node: NodeId,
        children: &[NodeId],
        values: &[Value],
        is_root: bool,
    ) -> Result<Resolved, SelectError> {
        let Some(rest) = raw.strip_prefix('$') else {
            return Ok(Resolved::Literal(raw.to_string()));
        };
        if rest == ".D" {
            if let Some(v) = self.d_bindings.get(&node) {
                return Ok(value_to_resolved(v));
            }
            let v = if is_root {
                match &self.forest.nodes[node].kind {
                    NodeKind::Ins { def: Some(d), .. } => Value::Reg(d.clone()),
                    _ => Value::Reg(self.fresh_temp()),
                }
            } else {
                Value::Reg(self.fresh_temp())
            };
            self.d_bindings.insert(node, v.clone());
            return Ok(value_to_resolved(&v));
        }

        let digit_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digit_end == 0 {
            return Err(SelectError::BadPlaceholder(raw.to_string()));
        }
        let idx: usize = rest[..digit_end].parse().map_err(|_| SelectError::BadPlaceholder(raw.to_string()))?;
        let suffix = &rest[digit_end..];
        let child_node = *children.get(idx).ok_or_else(|| SelectError::BadPlaceholder(raw.to_string()))?;
        let child_value = values.get(idx).ok_or_else(|| SelectError::BadPlaceholder(raw.to_string()))?;

        match suffix {
            "" | ".D" => Ok(value_to_resolved(child_value)),
            ".val" => match &self.forest.nodes[child_node].kind {
                NodeKind::Const(v) => Ok(Resolved::Const(*v)),
                _ => Err(SelectError::BadPlaceholder(raw.to_string())),
            },
            ".name" => match &self.forest.nodes[child_node].kind {
                NodeKind::Reg(name) => Ok(Resolved::Reg(name.clone())),
                NodeKind::Block(name) => Ok(Resolved::Literal(name.clone())),
                _ => Err(SelectError::BadPlaceholder(raw.to_string())),
            },
            ".def" => match &self.forest.nodes[child_node].kind {
                NodeKind::Ins { def: Some(d), .. } => Ok(Resolved::Reg(d.clone())),
                _ => Err(SelectError::BadPlaceholder(raw.to_string())),
            },
            _ => Err(SelectError::BadPlaceholder(raw.to_string())),
        }
    }
}

fn value_to_resolved(v: &Value) -> Resolved {
    match v {
        Value::Reg(s) => Resolved::Reg(s.clone()),
        Value::Const(c) => Resolved::Const(*c),
    }
}

#[cfg(test)]
mod tests {
    use super::super::forest::build_forest;
    use super::super::matcher::match_forest;
    use super::super::rules::RuleSet;
    use super::*;
    use clc_ir::{ArgKind, Function, InstKind, IsaContext};

    // spec §8 scenario S2, run end to end through matching and rewriting.
    #[test]
    fn s2_rewrites_two_adds_with_an_immediate() {
        let text = "\
reg ; add(reg, reg) ; 1 ; emit(add, $.D, $0.D, $1.D)
reg ; __const__x ; 1 ; set($.D, $0)
reg ; __reg__ ; 0 ; set($.D, $0.name)
";
        let rules = RuleSet::new(clc_reader::parse_rule_file(text).unwrap());

        let mut isa = IsaContext::new();
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::Const, ArgKind::RegDef]);

        let mut f = Function::new("f", vec!["a".into()]);
        let b0 = f.push_block("b0");
        f.block_mut(b0).push(clc_ir::Instruction::new(
            "add",
            vec![clc_ir::Token::Reg("a".into()), clc_ir::Token::Const(3), clc_ir::Token::Reg("t".into())],
        ));
        f.block_mut(b0).push(clc_ir::Instruction::new(
            "add",
            vec![clc_ir::Token::Reg("t".into()), clc_ir::Token::Const(4), clc_ir::Token::Reg("u".into())],
        ));

        let forest = build_forest(&f, &isa, b0).unwrap();
        let matching = match_forest(&forest, &rules);
        let mut rewriter = Rewriter::new(&forest, &rules, &matching);
        let root = forest.roots[0];
        let value = rewriter.rewrite_root(root, "reg").unwrap();
        assert_eq!(value, Value::Reg("u".into()));

        let out = rewriter.into_output();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].opcode, "add");
        assert_eq!(out[1].opcode, "add");
        // root register reuse: the final add still defines `u`, the name the
        // original IR gave it, not a fabricated temporary. Emitted operand
        // order here is `$.D, $0.D, $1.D` — destination first.
        assert_eq!(out[1].args[0], clc_ir::Token::Reg("u".into()));
    }
}
