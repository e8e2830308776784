//! Local common subexpression elimination: within a single block, two pure
//! instructions with the same opcode and the same operands (up to operand
//! order for a commutative opcode) compute the same value, so the second is
//! replaced by a use of the first's result and deleted. Scoped to a block
//! rather than the whole dominator tree — a value computed in one block
//! isn't assumed available in another without checking dominance, which
//! would need its own available-expression dataflow; this is the cheap,
//! always-sound subset of that.

use rustc_hash::FxHashMap;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Operand};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks() {
        let mut seen: FxHashMap<(crate::ir::Opcode, Vec<Operand>), crate::ir::Var> = FxHashMap::default();
        let insts: Vec<_> = func.layout.block_insts(block).collect();
        for inst in insts {
            let data = func.dfg.inst_data(inst);
            if !data.opcode.is_pure() || data.results.len() != 1 {
                continue;
            }
            let result = data.results[0];
            let mut operands: Vec<Operand> = data.operands.to_vec();
            if data.opcode.is_commutative() && operands.len() == 2 {
                operands.sort();
            }
            let key = (data.opcode, operands);
            if let Some(&existing) = seen.get(&key) {
                func.dfg.replace_all_uses(result, existing);
                func.layout.remove_inst(inst);
                changed = true;
            } else {
                seen.insert(key, result);
            }
        }
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn collapses_identical_adds() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let a = func.dfg.make_var();
        let b = func.dfg.make_var();
        let i0 = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(Literal::one()), Operand::Literal(Literal::zero())],
            smallvec![a],
        ));
        func.layout.append_inst(i0, b0);
        let i1 = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(Literal::one()), Operand::Literal(Literal::zero())],
            smallvec![b],
        ));
        func.layout.append_inst(i1, b0);
        let term = func.dfg.make_inst(InstructionData::new(
            Opcode::Return,
            smallvec![Operand::Var(b), Operand::Literal(Literal::zero())],
            Default::default(),
        ));
        func.layout.append_inst(term, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        assert_eq!(func.layout.block_insts(b0).count(), 2);
        let ret_operands = func.dfg.inst_operands(term);
        assert_eq!(ret_operands[0].as_var(), Some(a));
    }
}
