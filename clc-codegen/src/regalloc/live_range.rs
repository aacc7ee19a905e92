//! SSA live-range construction (spec §4.3 "Live-range construction"):
//! union-find over SSA names, phi operands unioned with the phi result.
//! Keyed by an `FxHashMap` rather than a dense pre-numbered array, since
//! this IR's register names are arbitrary strings.

use clc_ir::{Function, IsaContext, Token, UnknownOpcode};
use rustc_hash::FxHashMap;

pub struct LiveRanges {
    id_of: FxHashMap<String, usize>,
    names_of: Vec<Vec<String>>,
}

impl LiveRanges {
    pub fn count(&self) -> usize {
        self.names_of.len()
    }

    /// The live-range name (`lr0`, `lr1`, ...) a register belongs to.
    pub fn lr_name(&self, original: &str) -> Option<String> {
        self.id_of.get(original).map(|&id| format!("lr{id}"))
    }

    pub fn id_of(&self, original: &str) -> Option<usize> {
        self.id_of.get(original).copied()
    }

    /// The original SSA names that got merged into live range `id`, for
    /// diagnostics.
    pub fn members(&self, id: usize) -> &[String] {
        &self.names_of[id]
    }

    pub fn compute(func: &Function, isa: &IsaContext) -> Result<Self, UnknownOpcode> {
        let mut parent: Vec<usize> = Vec::new();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();

        for p in &func.params {
            get_or_insert(p, &mut index, &mut parent);
        }

        for (_, data) in func.blocks() {
            for inst in &data.insts {
                if inst.is_phi() {
                    let d = inst.phi_def().expect("phi instruction always defines a register");
                    let did = get_or_insert(d, &mut index, &mut parent);
                    for (_, operand) in inst.phi_operands().expect("phi instruction has operand pairs") {
                        let oid = get_or_insert(operand, &mut index, &mut parent);
                        union(&mut parent, did, oid);
                    }
                } else {
                    for d in inst.defs(isa)? {
                        get_or_insert(d, &mut index, &mut parent);
                    }
                    for u in inst.uses(isa)? {
                        get_or_insert(u, &mut index, &mut parent);
                    }
                }
            }
        }

        let mut root_to_id: FxHashMap<usize, usize> = FxHashMap::default();
        let mut names_of: Vec<Vec<String>> = Vec::new();
        let mut id_of: FxHashMap<String, usize> = FxHashMap::default();
        for (name, &slot) in &index {
            let root = find(&mut parent, slot);
            let id = *root_to_id.entry(root).or_insert_with(|| {
                names_of.push(Vec::new());
                names_of.len() - 1
            });
            names_of[id].push(name.clone());
            id_of.insert(name.clone(), id);
        }

        Ok(Self { id_of, names_of })
    }

    /// Deletes phi instructions and replaces every non-reserved register
    /// token with its live-range name.
    pub fn rewrite(&self, func: &mut Function, isa: &IsaContext) {
        for &b in func.block_order().to_vec().iter() {
            let mut rewritten = Vec::with_capacity(func.block(b).insts.len());
            for inst in func.block(b).insts.iter() {
                if inst.is_phi() {
                    continue;
                }
                let mut inst = inst.clone();
                for tok in inst.args.iter_mut() {
                    if let Token::Reg(r) = tok {
                        if !isa.is_reserved(r) {
                            if let Some(lr) = self.lr_name(r) {
                                *r = lr;
                            }
                        }
                    }
                }
                rewritten.push(inst);
            }
            func.block_mut(b).insts = rewritten;
        }
    }
}

fn get_or_insert(name: &str, index: &mut FxHashMap<String, usize>, parent: &mut Vec<usize>) -> usize {
    if let Some(&id) = index.get(name) {
        return id;
    }
    let id = parent.len();
    parent.push(id);
    index.insert(name.to_string(), id);
    id
}

fn find(parent: &mut [usize], x: usize) -> usize {
    if parent[x] != x {
        parent[x] = find(parent, parent[x]);
    }
    parent[x]
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clc_ir::{ArgKind, InstKind, Instruction, Token};

    fn isa() -> IsaContext {
        let mut isa = IsaContext::new();
        isa.define("phi", InstKind::Normal, vec![ArgKind::RegDef, ArgKind::Repeat]);
        isa.define("add", InstKind::Normal, vec![ArgKind::RegUse, ArgKind::RegUse, ArgKind::RegDef]);
        isa.define("br", InstKind::Branch, vec![ArgKind::BlockLabel]);
        isa.define("ret", InstKind::Return, vec![ArgKind::RegUse]);
        isa
    }

    #[test]
    fn phi_operands_join_the_same_live_range() {
        let mut f = Function::new("f", vec!["x".into()]);
        let left = f.push_block("left");
        let right = f.push_block("right");
        let join = f.push_block("join");
        f.block_mut(left).push(Instruction::new("br", vec![Token::Label("join".into())]));
        f.block_mut(right).push(Instruction::new("br", vec![Token::Label("join".into())]));
        f.block_mut(join).push(Instruction::new(
            "phi",
            vec![
                Token::Reg("m".into()),
                Token::Label("left".into()),
                Token::Reg("x".into()),
                Token::Label("right".into()),
                Token::Reg("x".into()),
            ],
        ));
        f.block_mut(join).push(Instruction::new("ret", vec![Token::Reg("m".into())]));

        let lr = LiveRanges::compute(&f, &isa()).unwrap();
        assert_eq!(lr.id_of("m"), lr.id_of("x"));
    }
}
