//! Deletes a memory-to-memory copy (`mcopy`, `calldatacopy`, `codecopy`,
//! `returndatacopy`) that provably moves nothing: a literal zero length, or
//! (for `mcopy` specifically) a source identical to its destination.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Opcode};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut to_remove = Vec::new();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            let is_copy = matches!(
                data.opcode,
                Opcode::Mcopy | Opcode::Calldatacopy | Opcode::Codecopy | Opcode::Returndatacopy
            );
            if !is_copy {
                continue;
            }
            let dst = &data.operands[0];
            let src = &data.operands[1];
            let len = &data.operands[2];
            let zero_length = len.as_literal().is_some_and(|l| l.is_zero());
            let self_copy = data.opcode == Opcode::Mcopy && dst == src;
            if zero_length || self_copy {
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
        ac.invalidate_memory();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Operand};
    use smallvec::smallvec;

    #[test]
    fn removes_zero_length_copy() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Mcopy,
            smallvec![
                Operand::Literal(Literal::from_u64(0)),
                Operand::Literal(Literal::from_u64(32)),
                Operand::Literal(Literal::zero()),
            ],
            Default::default(),
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        assert_eq!(func.layout.block_insts(b0).count(), 0);
    }
}
