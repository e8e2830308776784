//! Removes an `assert` whose condition [`crate::analysis::vra`] can prove is
//! never zero — the check can never fail, so it has no remaining effect.
//! An `assert` proven to *always* fail is left alone: that's a real,
//! reachable revert, not dead code, and rewriting the block that follows it
//! as unreachable is `SimplifyCFGPass`'s job once nothing after it can run.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Opcode};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let vra = ac.vra(func);
    let mut to_remove = Vec::new();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            if data.opcode != Opcode::Assert {
                continue;
            }
            let Some(cond) = data.operands[0].as_var() else { continue };
            if vra.range(cond).is_some_and(|r| r.cannot_be_zero()) {
                to_remove.push(inst);
            }
        }
    }
    let changed = !to_remove.is_empty();
    for inst in to_remove {
        func.layout.remove_inst(inst);
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}
