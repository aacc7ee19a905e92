//! The BURS instruction selector core (spec §4.2): block-to-forest
//! conversion, bottom-up matching with non-terminal closure, top-down
//! rewriting, and the two architecture modules of `SPEC_FULL.md` §D.

mod arch;
mod error;
mod forest;
mod matcher;
mod rewriter;
mod rules;

pub use arch::{Architecture, Generic64, GenericRisc};
pub use error::SelectError;
pub use forest::{Forest, NodeKind};
pub use matcher::Matching;
pub use rewriter::Value;
pub use rules::RuleSet;

use clc_ir::{Function, IsaContext};

/// Selects target code for one block: builds its forest, matches it against
/// `rules`, and rewrites it bottom-to-top against `goal` — one forest root
/// at a time, in program order, so the output preserves the block's
/// original instruction order wherever rules don't fuse anything.
pub fn select_block(
    func: &Function,
    isa: &IsaContext,
    block: clc_ir::Block,
    rules: &RuleSet,
    goal: &str,
) -> Result<Vec<clc_ir::Instruction>, SelectError> {
    let forest = forest::build_forest(func, isa, block)?;
    let matching = matcher::match_forest(&forest, rules);
    let mut rewriter = rewriter::Rewriter::new(&forest, rules, &matching);
    for &root in &forest.roots {
        if matching.best(root, goal).is_none() {
            return Err(SelectError::NoCover {
                function: func.name.clone(),
                block: func.block(block).name.clone(),
                node: root,
                nonterminal: goal.to_string(),
            });
        }
        rewriter.rewrite_root(root, goal)?;
    }
    Ok(rewriter.into_output())
}

/// Selects an entire function against one architecture module, running its
/// pre-IR and post-ASM passes around the per-block selection.
pub fn select_function(func: &mut Function, isa: &IsaContext, arch: &dyn Architecture) -> Result<(), SelectError> {
    arch.pre_ir_pass(func, isa)?;
    let rules = arch.rules();
    for &b in func.block_order().to_vec().iter() {
        let selected = select_block(func, isa, b, &rules, arch.root_nonterminal())?;
        func.block_mut(b).insts = selected;
    }
    arch.post_asm_pass(func, isa)?;
    Ok(())
}
