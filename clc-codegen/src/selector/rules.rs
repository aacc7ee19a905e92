//! A loaded, indexed rule set (spec §4.2 "Rules").

use clc_reader::{FlatRule, Rhs};
use rustc_hash::FxHashMap;

pub struct RuleSet {
    pub rules: Vec<FlatRule>,
    /// Chain rules grouped by their right-hand-side non-terminal, for the
    /// bottom-up closure pass.
    pub chains_by_rhs: FxHashMap<String, Vec<usize>>,
    /// Operator rules grouped by `(operator name, arity)`.
    pub ops_by_operator: FxHashMap<(String, usize), Vec<usize>>,
    /// Chain rules whose right-hand side is one of the special leaf
    /// non-terminals — these are the base case matched directly against
    /// `Const`/`Reg`/`Block` forest leaves rather than through the closure.
    pub leaf_rules: Vec<usize>,
}

impl RuleSet {
    pub fn new(rules: Vec<FlatRule>) -> Self {
        let mut chains_by_rhs: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut ops_by_operator: FxHashMap<(String, usize), Vec<usize>> = FxHashMap::default();
        let mut leaf_rules = Vec::new();
        for (i, r) in rules.iter().enumerate() {
            match &r.rhs {
                Rhs::Chain(nt) => {
                    chains_by_rhs.entry(nt.clone()).or_default().push(i);
                    if Self::leaf_kind(nt).is_some() {
                        leaf_rules.push(i);
                    }
                }
                Rhs::Op(op, children) => ops_by_operator.entry((op.clone(), children.len())).or_default().push(i),
            }
        }
        Self { rules, chains_by_rhs, ops_by_operator, leaf_rules }
    }

    /// Is `nt` one of the three special leaf non-terminals (spec §4.2), and
    /// if `__const__`, does it require an exact value?
    pub fn leaf_kind(nt: &str) -> Option<LeafKind> {
        if nt == "__reg__" {
            Some(LeafKind::Reg)
        } else if nt == "__block__" {
            Some(LeafKind::Block)
        } else if let Some(suffix) = nt.strip_prefix("__const__") {
            Some(match suffix.parse::<i64>() {
                Ok(v) => LeafKind::ConstExact(v),
                Err(_) => LeafKind::ConstAny, // bare `__const__` or a symbolic suffix
            })
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Reg,
    Block,
    ConstAny,
    ConstExact(i64),
}
