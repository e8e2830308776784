//! Eliminates `phi` instructions by inserting an `assign` of the incoming
//! value into the phi's own result variable at the end of each predecessor
//! (just before its terminator), then deleting the phi. Every use of the
//! phi's result downstream is untouched — it keeps naming the same `Var`,
//! which now simply has more than one assignment reaching it along
//! different paths, the inverse of what `MakeSSA` built. This is the
//! standard "lower out of SSA" step: after it runs no `phi` remains, which
//! the stack scheduler (it has no notion of a block parameter) requires.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, InstructionData, Opcode, Operand};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let blocks: Vec<_> = func.blocks().collect();
    for block in blocks {
        let phis: Vec<_> = func
            .layout
            .block_insts(block)
            .filter(|&i| func.dfg.opcode(i) == Opcode::Phi)
            .collect();
        for phi in phis {
            let data = func.dfg.inst_data(phi).clone();
            let result = data.result().expect("phi must define a result");
            for (label, value) in data.phi_args().map(|(l, v)| (l.clone(), v)) {
                let Some(pred) = func.block_by_label(&label) else { continue };
                let Some(term) = func.layout.last_inst(pred) else { continue };
                if value == result {
                    // A phi can trivially name its own result along a
                    // back-edge (a loop-carried value that didn't change on
                    // that path); assigning a variable to itself is a no-op.
                    continue;
                }
                let assign = func.dfg.make_inst(InstructionData::new(
                    Opcode::Assign,
                    smallvec![Operand::Var(value)],
                    smallvec![result],
                ));
                func.layout.insert_inst_before(assign, term);
            }
            func.layout.remove_inst(phi);
            changed = true;
        }
    }
    if changed {
        ac.invalidate_def_use();
        ac.invalidate_cfg();
    }
    changed
}
