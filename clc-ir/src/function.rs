//! [`Function`]: name, ordered argument registers, ordered blocks.

use crate::block::BasicBlockData;
use crate::entities::Block;
use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    /// Ordered argument register names (spec §3: "ordered argument-register
    /// names").
    pub params: Vec<String>,
    blocks: PrimaryMap<Block, BasicBlockData>,
    order: Vec<Block>,
    by_name: FxHashMap<String, Block>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
            blocks: PrimaryMap::new(),
            order: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Appends a new, empty block at the end of the function and returns its
    /// reference. The first block ever pushed becomes the entry block.
    pub fn push_block(&mut self, name: impl Into<String>) -> Block {
        let name = name.into();
        let b = self.blocks.push(BasicBlockData::new(name.clone()));
        self.order.push(b);
        self.by_name.insert(name, b);
        b
    }

    pub fn entry(&self) -> Option<Block> {
        self.order.first().copied()
    }

    pub fn block(&self, b: Block) -> &BasicBlockData {
        &self.blocks[b]
    }

    pub fn block_mut(&mut self, b: Block) -> &mut BasicBlockData {
        &mut self.blocks[b]
    }

    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.by_name.get(name).copied()
    }

    /// Blocks in program (layout) order, entry first.
    pub fn block_order(&self) -> &[Block] {
        &self.order
    }

    pub fn blocks(&self) -> impl Iterator<Item = (Block, &BasicBlockData)> {
        self.order.iter().map(move |&b| (b, &self.blocks[b]))
    }

    pub fn num_blocks(&self) -> usize {
        self.order.len()
    }

    /// Replaces the block order wholesale (used after scheduling moves
    /// instructions between blocks; block identities are unchanged, only
    /// the instructions inside each block change, so this is rarely needed,
    /// but kept for passes that insert new blocks).
    pub fn set_order(&mut self, order: Vec<Block>) {
        debug_assert_eq!(order.len(), self.order.len());
        self.order = order;
    }

    /// A Function is in SSA form if every register it defines is defined by
    /// exactly one instruction (spec §3). `defs_of` must be supplied by the
    /// caller (it requires walking with an `IsaContext`, which lives in a
    /// crate above this one); this just checks the multiset property given
    /// the caller-gathered def names.
    pub fn is_ssa_given_defs<'a>(defs: impl IntoIterator<Item = &'a str>) -> bool {
        let mut seen = rustc_hash::FxHashSet::default();
        for d in defs {
            if !seen.insert(d) {
                return false;
            }
        }
        true
    }
}
