//! Relinearizes a function's blocks into a canonical order: a preorder
//! depth-first walk from the entry block, visiting successors in the order
//! the terminator lists them. This is the last pass in the per-function
//! pipeline, so by the time it runs every other pass has already settled on
//! final control flow — what's left is making sure two semantically
//! identical functions always print (and assemble) identically, and that a
//! block no longer reachable from the entry (one `SimplifyCFGPass` missed,
//! or one that became unreachable from a rewrite after its last run) is
//! dropped instead of assembled somewhere nonsensical.

use rustc_hash::FxHashSet;

use crate::analysis::{AnalysisCache, ControlFlowGraph};
use crate::ir::{Block, Function};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let Some(entry) = func.entry_block() else { return false };
    let cfg = ac.cfg(func);
    let order = reachable_preorder(func, &cfg, entry);
    let current: Vec<_> = func.blocks().collect();
    if order == current {
        return false;
    }

    for &block in &current {
        func.layout.remove_block(block);
    }
    for block in &order {
        func.layout.append_block(*block);
    }
    ac.invalidate_cfg();
    true
}

fn reachable_preorder(_func: &Function, cfg: &ControlFlowGraph, entry: Block) -> Vec<Block> {
    let mut visited = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![entry];
    visited.insert(entry);
    while let Some(block) = stack.pop() {
        order.push(block);
        let succs: Vec<_> = cfg.succ_iter(block).collect();
        for &s in succs.iter().rev() {
            if visited.insert(s) {
                stack.push(s);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn drops_unreachable_block_and_orders_by_branch_target() {
        let mut func = Function::new(Label::new("f"));
        let entry = func.dfg.make_block();
        let dead = func.dfg.make_block();
        let reached = func.dfg.make_block();
        func.dfg.set_block_label(entry, Label::new("entry"));
        func.dfg.set_block_label(dead, Label::new("dead"));
        func.dfg.set_block_label(reached, Label::new("reached"));

        // Layout order deliberately disagrees with reachability order.
        func.layout.append_block(entry);
        func.layout.append_block(dead);
        func.layout.append_block(reached);

        let jmp = func.dfg.make_inst(InstructionData::new(
            Opcode::Jmp,
            smallvec![Operand::Label(Label::new("reached"))],
            Default::default(),
        ));
        func.layout.append_inst(jmp, entry);
        let stop1 = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop1, dead);
        let stop2 = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop2, reached);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let order: Vec<_> = func.blocks().collect();
        assert_eq!(order, vec![entry, reached]);
    }
}
