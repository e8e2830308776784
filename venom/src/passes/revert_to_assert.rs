//! Recognizes `jnz cond, a, b` where one target is nothing but a bare
//! `revert(0, 0)` and turns it into a single `assert` followed by an
//! unconditional jump to the surviving target, trading a branch and a block
//! for one linear instruction. `SimplifyCFGPass` cleans up the revert block
//! afterward if this was its only remaining predecessor.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Block, Function, InstructionData, Opcode, Operand};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let blocks: Vec<_> = func.blocks().collect();
    for block in blocks {
        let Some(term) = func.layout.last_inst(block) else { continue };
        let data = func.dfg.inst_data(term).clone();
        if data.opcode != Opcode::Jnz {
            continue;
        }
        let Some(true_label) = data.operands[1].as_label() else { continue };
        let Some(false_label) = data.operands[2].as_label() else { continue };
        let Some(true_target) = func.block_by_label(true_label) else { continue };
        let Some(false_target) = func.block_by_label(false_label) else { continue };
        let cond = data.operands[0].clone();

        if is_bare_revert(func, true_target) {
            let iszero_result = func.dfg.make_var();
            let iszero_inst = func.dfg.make_inst(InstructionData::new(
                Opcode::Iszero,
                smallvec![cond],
                smallvec![iszero_result],
            ));
            func.layout.insert_inst_before(iszero_inst, term);
            let assert_inst = func.dfg.make_inst(InstructionData::new(
                Opcode::Assert,
                smallvec![Operand::Var(iszero_result)],
                Default::default(),
            ));
            func.layout.insert_inst_before(assert_inst, term);
            func.dfg.replace_inst(
                term,
                InstructionData::new(Opcode::Jmp, smallvec![data.operands[2].clone()], Default::default()),
            );
            changed = true;
        } else if is_bare_revert(func, false_target) {
            let assert_inst =
                func.dfg.make_inst(InstructionData::new(Opcode::Assert, smallvec![cond], Default::default()));
            func.layout.insert_inst_before(assert_inst, term);
            func.dfg.replace_inst(
                term,
                InstructionData::new(Opcode::Jmp, smallvec![data.operands[1].clone()], Default::default()),
            );
            changed = true;
        }
    }
    if changed {
        ac.invalidate_cfg();
    }
    changed
}

fn is_bare_revert(func: &Function, block: Block) -> bool {
    let insts: Vec<_> = func.layout.block_insts(block).collect();
    let [only] = insts.as_slice() else { return false };
    let data = func.dfg.inst_data(*only);
    data.opcode == Opcode::Revert
        && data.operands[0].as_literal().is_some_and(|l| l.is_zero())
        && data.operands[1].as_literal().is_some_and(|l| l.is_zero())
}
