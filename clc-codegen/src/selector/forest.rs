//! Block-to-forest conversion (spec §4.2 steps 1–3): each instruction
//! becomes a tree rooted at its defined register, with uses that are
//! themselves single-use local definitions inlined as child subtrees
//! instead of leaves, so the matcher sees multi-instruction expression
//! trees rather than one tree per instruction. The open-class
//! `Const`/`Reg`/`Block`/`Ins` hierarchy of a typical tree-matching
//! implementation is replaced here by the tagged [`NodeKind`] variant named
//! in spec §9 "Polymorphism of expression-tree nodes".

use clc_ir::{Block, Function, IsaContext, Token, UnknownOpcode};
use rustc_hash::FxHashMap;

pub type NodeId = usize;

#[derive(Clone, Debug)]
pub enum NodeKind {
    Const(i64),
    Reg(String),
    Block(String),
    Ins { op: String, args: Vec<NodeId>, def: Option<String> },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub order: usize,
}

/// A per-block forest: an arena of nodes plus the ids of its tree roots, in
/// program order.
pub struct Forest {
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
}

impl Forest {
    pub fn depth(&self, n: NodeId) -> usize {
        match &self.nodes[n].kind {
            NodeKind::Const(_) | NodeKind::Reg(_) | NodeKind::Block(_) => 0,
            NodeKind::Ins { args, .. } => 1 + args.iter().map(|&a| self.depth(a)).max().unwrap_or(0),
        }
    }
}

struct Builder {
    nodes: Vec<Node>,
    consts: FxHashMap<i64, NodeId>,
    regs: FxHashMap<String, NodeId>,
    blocks: FxHashMap<String, NodeId>,
}

impl Builder {
    fn const_node(&mut self, c: i64) -> NodeId {
        if let Some(&id) = self.consts.get(&c) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node { kind: NodeKind::Const(c), order: id });
        self.consts.insert(c, id);
        id
    }

    fn reg_leaf(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.regs.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node { kind: NodeKind::Reg(name.to_string()), order: id });
        self.regs.insert(name.to_string(), id);
        id
    }

    fn block_leaf(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.blocks.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node { kind: NodeKind::Block(name.to_string()), order: id });
        self.blocks.insert(name.to_string(), id);
        id
    }
}

/// Builds the DAG for one block and converts it to a forest of trees.
pub fn build_forest(func: &Function, isa: &IsaContext, block: Block) -> Result<Forest, UnknownOpcode> {
    let data = func.block(block);
    let mut b = Builder { nodes: Vec::new(), consts: FxHashMap::default(), regs: FxHashMap::default(), blocks: FxHashMap::default() };
    let mut producer: FxHashMap<String, NodeId> = FxHashMap::default();
    let mut ins_ids = Vec::new();

    for (order, inst) in data.insts.iter().enumerate() {
        let spec = isa.lookup(&inst.opcode).ok_or_else(|| UnknownOpcode(inst.opcode.clone()))?;
        let mut args = Vec::with_capacity(inst.args.len());
        for (i, tok) in inst.args.iter().enumerate() {
            let id = match tok {
                Token::Const(c) => b.const_node(*c),
                Token::Label(l) => b.block_leaf(l),
                Token::Reg(r) => {
                    let is_def_only = matches!(spec.arg_kind_at(i), Some(clc_ir::ArgKind::RegDef));
                    if is_def_only {
                        continue; // the def token is recorded separately, not as an operand edge
                    }
                    *producer.entry(r.clone()).or_insert_with(|| b.reg_leaf(r))
                }
            };
            args.push(id);
        }
        let def = inst.defs(isa)?.first().map(|s| s.to_string());
        let id = b.nodes.len();
        b.nodes.push(Node { kind: NodeKind::Ins { op: inst.opcode.clone(), args, def: def.clone() }, order });
        if let Some(d) = def {
            producer.insert(d, id);
        }
        ins_ids.push(id);
    }

    let mut nodes = b.nodes;
    let pred_count = count_predecessors(&nodes);
    let dag_roots: Vec<NodeId> = ins_ids.into_iter().filter(|&id| pred_count[id] == 0).collect();
    to_forest(&mut nodes, &dag_roots, &pred_count)
}

fn count_predecessors(nodes: &[Node]) -> Vec<usize> {
    let mut count = vec![0usize; nodes.len()];
    for n in nodes {
        if let NodeKind::Ins { args, .. } = &n.kind {
            for &a in args {
                count[a] += 1;
            }
        }
    }
    count
}

/// Converts the DAG of `nodes` (whose in-degree-0 `Ins` nodes are
/// `dag_roots`) into a forest: every `Ins` node with more than one
/// predecessor is either cloned (shallow subtrees) or extracted into its
/// own tree root behind a fresh `Reg` boundary (deeper subtrees).
fn to_forest(
    nodes: &mut Vec<Node>,
    dag_roots: &[NodeId],
    pred_count: &[usize],
) -> Result<Forest, UnknownOpcode> {
    let mut pred_count = pred_count.to_vec();
    let mut extra_roots: Vec<NodeId> = Vec::new();
    let mut spill_counter = 0u32;

    // Snapshot, since we'll be appending clones while iterating the
    // original node set.
    let original_len = nodes.len();
    for n in 0..original_len {
        if pred_count[n] <= 1 {
            continue;
        }
        let depth = {
            let f = Forest { nodes: nodes.clone(), roots: Vec::new() };
            f.depth(n)
        };
        let shares = pred_count[n];
        if depth < 2 {
            // Clone for every use past the first; each clone is itself
            // single-use so it doesn't re-trigger this pass.
            for _ in 1..shares {
                let clone = nodes[n].clone();
                let clone_id = nodes.len();
                nodes.push(clone);
                pred_count.push(0);
                replace_one_operand_reference(nodes, n, clone_id);
            }
        } else {
            // Extract: give the node an explicit register name (reuse its
            // own def if it has one) and replace every operand reference
            // with a fresh Reg leaf for that name.
            let name = match &nodes[n].kind {
                NodeKind::Ins { def: Some(d), .. } => d.clone(),
                _ => {
                    spill_counter += 1;
                    format!("__spill{spill_counter}")
                }
            };
            if let NodeKind::Ins { def, .. } = &mut nodes[n].kind {
                *def = Some(name.clone());
            }
            let leaf_id = nodes.len();
            nodes.push(Node { kind: NodeKind::Reg(name), order: nodes[n].order });
            for _ in 0..shares {
                replace_one_operand_reference(nodes, n, leaf_id);
            }
            extra_roots.push(n);
        }
    }

    let mut roots: Vec<NodeId> = dag_roots.to_vec();
    roots.extend(extra_roots);
    roots.sort_by_key(|&r| nodes[r].order);
    roots.dedup();

    Ok(Forest { nodes: nodes.clone(), roots })
}

/// Rewrites exactly one remaining operand edge pointing at `from` to point
/// at `to` instead (used to peel off one user at a time while cloning or
/// extracting).
fn replace_one_operand_reference(nodes: &mut [Node], from: NodeId, to: NodeId) {
    for n in nodes.iter_mut() {
        if let NodeKind::Ins { args, .. } = &mut n.kind {
            if let Some(slot) = args.iter_mut().find(|a| **a == from) {
                *slot = to;
                return;
            }
        }
    }
}
