//! Canonicalizes conditional branches: a `jnz iszero(x), a, b` is rewritten
//! to `jnz x, b, a` so the `iszero` (dead once its only use is gone) can be
//! removed by [`crate::passes::remove_unused_variables`], and a `jnz` whose
//! two targets are the same label becomes an unconditional `jmp` regardless
//! of which way the condition goes.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, InstructionData, Opcode, ValueDef};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let blocks: Vec<_> = func.blocks().collect();
    for block in blocks {
        let Some(term) = func.layout.last_inst(block) else { continue };
        let data = func.dfg.inst_data(term).clone();
        if data.opcode != Opcode::Jnz {
            continue;
        }

        if data.operands[1] == data.operands[2] {
            func.dfg.replace_inst(
                term,
                InstructionData::new(Opcode::Jmp, smallvec![data.operands[1].clone()], Default::default()),
            );
            changed = true;
            continue;
        }

        if let Some(cond) = data.operands[0].as_var() {
            if let Some(ValueDef::Result(def_inst, _)) = func.dfg.value_def(cond) {
                let def_data = func.dfg.inst_data(def_inst);
                if def_data.opcode == Opcode::Iszero {
                    let inner = def_data.operands[0].clone();
                    func.dfg.replace_inst(
                        term,
                        InstructionData::new(
                            Opcode::Jnz,
                            smallvec![inner, data.operands[2].clone(), data.operands[1].clone()],
                            Default::default(),
                        ),
                    );
                    changed = true;
                }
            }
        }
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}
