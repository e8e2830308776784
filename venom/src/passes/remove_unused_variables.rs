//! Dead-code elimination: repeatedly deletes any instruction whose results
//! are all unused and which [`crate::inst_predicates::is_removable_when_unused`]
//! says has no side effect, until a sweep finds nothing left to remove.
//! Re-scanning uses from scratch each sweep (rather than maintaining an
//! incremental use-count) is worth it for how rarely this needs more than
//! two iterations to reach a fixed point in practice.

use rustc_hash::FxHashSet;

use crate::analysis::AnalysisCache;
use crate::inst_predicates::is_removable_when_unused;
use crate::ir::Function;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let mut used = FxHashSet::default();
        for block in func.blocks() {
            for inst in func.layout.block_insts(block) {
                for v in func.dfg.inst_operands(inst).iter().filter_map(|o| o.as_var()) {
                    used.insert(v);
                }
            }
        }

        let mut to_remove = Vec::new();
        for block in func.blocks() {
            for inst in func.layout.block_insts(block) {
                if !is_removable_when_unused(func, inst) {
                    continue;
                }
                let results = func.dfg.inst_results(inst);
                if !results.is_empty() && results.iter().all(|v| !used.contains(v)) {
                    to_remove.push(inst);
                }
            }
        }

        if to_remove.is_empty() {
            break;
        }
        for inst in to_remove {
            func.layout.remove_inst(inst);
        }
        changed = true;
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn removes_instruction_with_no_uses() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let dead = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(crate::ir::Literal::zero()), Operand::Literal(crate::ir::Literal::one())],
            smallvec![func.dfg.make_var()],
        ));
        func.layout.append_inst(dead, b0);
        let term = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(term, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        assert_eq!(func.layout.block_insts(b0).count(), 1);
    }
}
