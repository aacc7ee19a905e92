//! Bottom-up BURS matching (spec §4.2 "Matching"): for every forest node,
//! in post-order, record the cheapest rule covering it for each reachable
//! non-terminal, then close the result under chain rules, for an arbitrary
//! rule set rather than a fixed grammar.

use super::forest::{Forest, NodeId, NodeKind};
use super::rules::{LeafKind, RuleSet};
use clc_reader::{FlatRule, Rhs};
use rustc_hash::FxHashMap;

/// The cheapest rule found so far for one (node, non-terminal) pair.
#[derive(Clone, Copy, Debug)]
pub struct Cover {
    pub rule: usize,
    pub cost: i64,
}

/// One node's best covers, keyed by non-terminal.
pub type NodeCovers = FxHashMap<String, Cover>;

pub struct Matching {
    pub covers: Vec<NodeCovers>,
}

impl Matching {
    pub fn best(&self, node: NodeId, nonterminal: &str) -> Option<Cover> {
        self.covers[node].get(nonterminal).copied()
    }
}

/// Matches every node of `forest` against `rules`, bottom-up. Node ids in a
/// [`Forest`] always exceed the ids of every node they reference, so a
/// simple ascending scan is already post-order.
pub fn match_forest(forest: &Forest, rules: &RuleSet) -> Matching {
    let mut covers: Vec<NodeCovers> = vec![FxHashMap::default(); forest.nodes.len()];

    for n in 0..forest.nodes.len() {
        let mut queue: Vec<(String, i64)> = Vec::new();

        match &forest.nodes[n].kind {
            NodeKind::Const(value) => {
                for &ri in &rules.leaf_rules {
                    let rule = &rules.rules[ri];
                    let matches = match RuleSet::leaf_kind(chain_rhs(rule)) {
                        Some(LeafKind::ConstAny) => true,
                        Some(LeafKind::ConstExact(v)) => v == *value,
                        _ => false,
                    };
                    if matches {
                        try_record(&mut covers[n], &mut queue, rule.lhs.clone(), ri, rule.cost);
                    }
                }
            }
            NodeKind::Reg(_) => {
                for &ri in &rules.leaf_rules {
                    let rule = &rules.rules[ri];
                    if matches!(RuleSet::leaf_kind(chain_rhs(rule)), Some(LeafKind::Reg)) {
                        try_record(&mut covers[n], &mut queue, rule.lhs.clone(), ri, rule.cost);
                    }
                }
            }
            NodeKind::Block(_) => {
                for &ri in &rules.leaf_rules {
                    let rule = &rules.rules[ri];
                    if matches!(RuleSet::leaf_kind(chain_rhs(rule)), Some(LeafKind::Block)) {
                        try_record(&mut covers[n], &mut queue, rule.lhs.clone(), ri, rule.cost);
                    }
                }
            }
            NodeKind::Ins { op, args, .. } => {
                if let Some(candidates) = rules.ops_by_operator.get(&(op.clone(), args.len())) {
                    for &ri in candidates {
                        let rule = &rules.rules[ri];
                        if let Rhs::Op(_, children_nts) = &rule.rhs {
                            let mut total = rule.cost;
                            let mut ok = true;
                            for (&arg, nt) in args.iter().zip(children_nts.iter()) {
                                match covers[arg].get(nt) {
                                    Some(c) => total += c.cost,
                                    None => {
                                        ok = false;
                                        break;
                                    }
                                }
                            }
                            if ok {
                                try_record(&mut covers[n], &mut queue, rule.lhs.clone(), ri, total);
                            }
                        }
                    }
                }
            }
        }

        // Close under chain rules: establishing `nt` at cost `c` may make
        // `lhs -> nt` rules applicable at cost `c + rule.cost`, which in
        // turn may trigger further chains.
        while let Some((nt, cost)) = queue.pop() {
            let Some(chain_idxs) = rules.chains_by_rhs.get(&nt) else { continue };
            for &ri in chain_idxs {
                let rule = &rules.rules[ri];
                if RuleSet::leaf_kind(&nt).is_some() {
                    continue; // leaf base cases are not chain targets
                }
                let candidate = cost + rule.cost;
                try_record(&mut covers[n], &mut queue, rule.lhs.clone(), ri, candidate);
            }
        }
    }

    Matching { covers }
}

fn chain_rhs(rule: &FlatRule) -> &str {
    match &rule.rhs {
        Rhs::Chain(nt) => nt,
        Rhs::Op(..) => "",
    }
}

/// Spec §4.2: "if the rule matches with cost c and the previous best cost
/// ... was >= c, record it as the new best" — ties prefer the
/// later-considered rule.
fn try_record(node_covers: &mut NodeCovers, queue: &mut Vec<(String, i64)>, lhs: String, rule: usize, cost: i64) {
    let replace = match node_covers.get(&lhs) {
        Some(existing) => cost <= existing.cost,
        None => true,
    };
    if replace {
        node_covers.insert(lhs.clone(), Cover { rule, cost });
        queue.push((lhs, cost));
    }
}

#[cfg(test)]
mod tests {
    use super::super::forest::build_forest;
    use super::super::rules::RuleSet;
    use super::*;
    use clc_ir::{ArgKind, InstKind, IsaContext, Function, Instruction, Token};

    // spec §8 scenario S2.
    #[test]
    fn s2_add_chain_costs_four() {
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
        f.block_mut(b0).push(Instruction::new("add", vec![Token::Reg("a".into()), Token::Const(3), Token::Reg("t".into())]));
        f.block_mut(b0).push(Instruction::new("add", vec![Token::Reg("t".into()), Token::Const(4), Token::Reg("u".into())]));

        let forest = build_forest(&f, &isa, b0).unwrap();
        assert_eq!(forest.roots.len(), 1);
        let matching = match_forest(&forest, &rules);
        let root = forest.roots[0];
        assert_eq!(matching.best(root, "reg").unwrap().cost, 4);
    }
}
