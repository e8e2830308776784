//! Splits a variable used more than once across the function into one
//! single-use copy per extra use site, inserted immediately before the
//! instruction that needs it. The stack scheduler can place a single-use
//! value directly under the instruction that consumes it and never has to
//! `dup` it back up from deeper in the stack; running this late in the
//! pipeline (after CSE/SCCP have stopped creating new shared subexpressions)
//! keeps the number of inserted copies proportional to genuine sharing in
//! the optimized program rather than transient duplication the earlier
//! passes will have already cleaned up.

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, InstructionData, Opcode, Operand, Var};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut use_count: FxHashMap<Var, u32> = FxHashMap::default();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            for v in func.dfg.inst_operands(inst).iter().filter_map(|o| o.as_var()) {
                *use_count.entry(v).or_default() += 1;
            }
        }
    }

    let mut changed = false;
    for block in func.blocks() {
        let insts: Vec<_> = func.layout.block_insts(block).collect();
        for inst in insts {
            if func.dfg.opcode(inst).is_phi() {
                // Phi operands belong to the predecessor that supplies them,
                // not the block the phi sits in; splitting them here would
                // insert a copy in the wrong block.
                continue;
            }
            let operand_count = func.dfg.inst_operands(inst).len();
            for idx in 0..operand_count {
                let Some(v) = func.dfg.inst_operands(inst)[idx].as_var() else { continue };
                if use_count.get(&v).copied().unwrap_or(0) <= 1 {
                    continue;
                }
                let copy = func.dfg.make_var();
                let copy_inst = func.dfg.make_inst(InstructionData::new(
                    Opcode::Assign,
                    smallvec![Operand::Var(v)],
                    smallvec![copy],
                ));
                func.layout.insert_inst_before(copy_inst, inst);
                func.dfg.inst_data_mut(inst).operands[idx] = Operand::Var(copy);
                changed = true;
            }
        }
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}
