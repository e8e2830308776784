//! Promotes an `alloca` whose address is never used for anything but direct
//! `mload`/`mstore` (never passed to a call, never recombined through
//! `offset`) into an ordinary SSA-reconstructible variable: each `mstore`
//! becomes `assign shadow = value` and each `mload` becomes
//! `assign result = shadow`, all naming the same `shadow` variable. That
//! turns the promoted local into exactly the "reassigned along different
//! paths" shape [`crate::passes::make_ssa`] already knows how to convert to
//! real SSA with proper phis — this pass doesn't place any phis itself, it
//! just needs `MakeSSA` to run again afterward, which the pipeline does.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::cursor::{Cursor, FuncCursor};
use crate::ir::{Function, Inst, InstructionData, Literal, Opcode, Operand, Var};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let Some(entry) = func.entry_block() else { return false };

    let mut changed = false;
    let candidates = find_promotable_allocas(func);
    for (alloca_inst, ptr) in candidates {
        let uses = find_uses(func, ptr);
        let shadow = func.dfg.make_var();

        let mut cursor = FuncCursor::new(func);
        cursor.at_top(entry);
        cursor.insert_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::zero())],
            smallvec![shadow],
        ));

        for inst in uses {
            let data = func.dfg.inst_data(inst).clone();
            match data.opcode {
                Opcode::Mstore => {
                    let value = data.operands[1].clone();
                    func.dfg.replace_inst(inst, InstructionData::new(Opcode::Assign, smallvec![value], smallvec![shadow]));
                }
                Opcode::Mload => {
                    let result = data.result().expect("mload always defines a result");
                    func.dfg.replace_inst(
                        inst,
                        InstructionData::new(Opcode::Assign, smallvec![Operand::Var(shadow)], smallvec![result]),
                    );
                }
                _ => unreachable!("find_promotable_allocas only admits mload/mstore uses"),
            }
        }
        func.layout.remove_inst(alloca_inst);
        changed = true;
    }

    if changed {
        ac.invalidate_def_use();
        ac.invalidate_cfg();
    }
    changed
}

fn find_promotable_allocas(func: &Function) -> Vec<(Inst, Var)> {
    let mut out = Vec::new();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            if data.opcode != Opcode::Alloca {
                continue;
            }
            let Some(ptr) = data.result() else { continue };
            let uses = find_uses(func, ptr);
            let promotable = !uses.is_empty()
                && uses.iter().all(|&u| {
                    let d = func.dfg.inst_data(u);
                    match d.opcode {
                        Opcode::Mstore => d.operands[0].as_var() == Some(ptr),
                        Opcode::Mload => d.operands[0].as_var() == Some(ptr),
                        _ => false,
                    }
                });
            if promotable {
                out.push((inst, ptr));
            }
        }
    }
    out
}

fn find_uses(func: &Function, var: Var) -> Vec<Inst> {
    let mut out = Vec::new();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            if func.dfg.inst_operands(inst).iter().any(|o| o.as_var() == Some(var)) {
                out.push(inst);
            }
        }
    }
    out
}
