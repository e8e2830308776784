//! Drops a redundant `assert`: if control already passed an `assert` on the
//! exact same operand earlier in the block with nothing in between that
//! could change its value, checking it again can't fail any differently.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Opcode, Operand};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut to_remove = Vec::new();
    for block in func.blocks() {
        let mut last_condition: Option<Operand> = None;
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            match data.opcode {
                Opcode::Assert | Opcode::AssertUnreachable => {
                    if data.opcode == Opcode::Assert {
                        let cond = data.operands[0].clone();
                        if last_condition.as_ref() == Some(&cond) {
                            to_remove.push(inst);
                        } else {
                            last_condition = Some(cond);
                        }
                    }
                }
                _ if !data.opcode.is_pure() => last_condition = None,
                _ => {}
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
