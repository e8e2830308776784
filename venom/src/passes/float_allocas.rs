//! Hoists every `alloca`/`palloca`/`calloca` to the top of the entry block.
//! Later passes (in particular `ConcretizeMemLocPass`, which assigns
//! offsets by bump-allocating in program order) assume every stack-frame
//! slot is visible from the entry block; a frontend is free to emit an
//! `alloca` anywhere a local first comes into scope, so this pass is run
//! first to establish that invariant before anything else looks at memory
//! locations.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Opcode};

pub fn run(_ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let Some(entry) = func.entry_block() else { return false };
    let mut to_move = Vec::new();
    for block in func.blocks() {
        if block == entry {
            continue;
        }
        for inst in func.layout.block_insts(block) {
            let op = func.dfg.inst_data(inst).opcode;
            if matches!(op, Opcode::Alloca | Opcode::Palloca | Opcode::Calloca) {
                to_move.push(inst);
            }
        }
    }
    if to_move.is_empty() {
        return false;
    }
    for inst in to_move {
        func.layout.remove_inst(inst);
        match func.layout.block_insts(entry).next() {
            Some(first) => func.layout.insert_inst_before(inst, first),
            None => func.layout.append_inst(inst, entry),
        }
    }
    true
}
