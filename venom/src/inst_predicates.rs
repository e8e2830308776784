//! Instruction predicates shared by the dead-code eliminators, CSE, and the
//! scheduler: whether an instruction's results are used, and whether it has
//! a side effect that precludes removing it even when they aren't.

use crate::ir::{DataFlowGraph, Function, Inst, InstructionData, Opcode, Var};
use crate::entity::EntityRef;

pub fn any_inst_results_used(inst: Inst, live: &[bool], dfg: &DataFlowGraph) -> bool {
    dfg.inst_results(inst).iter().any(|v| live.get(v.index()).copied().unwrap_or(false))
}

fn trivially_has_side_effects(opcode: Opcode) -> bool {
    opcode.is_call()
        || opcode.is_branch()
        || opcode.is_terminator()
        || opcode.is_return()
        || opcode.can_trap()
        || opcode.other_side_effects()
        || opcode.can_store()
}

/// Loads are defined to trap on certain address spaces (e.g. an
/// out-of-bounds `calldataload` does not trap on the EVM, but a malformed
/// `dload` from a data section the assembler can statically bound-check
/// does); conservatively, any load is kept unless proven dead by a more
/// specific analysis (memory SSA), matching the teacher's
/// `is_load_with_defined_trapping`.
fn is_load_with_defined_trapping(opcode: Opcode, _data: &InstructionData) -> bool {
    opcode.can_load()
}

pub fn has_side_effect(func: &Function, inst: Inst) -> bool {
    let data = func.dfg.inst_data(inst);
    let opcode = data.opcode;
    trivially_has_side_effects(opcode) || is_load_with_defined_trapping(opcode, data)
}

/// Whether an instruction can be safely deleted when none of its results
/// are used: no side effect, and not a terminator (every block must stay
/// terminated).
pub fn is_removable_when_unused(func: &Function, inst: Inst) -> bool {
    !has_side_effect(func, inst)
}

/// All variables a (possibly multi-result) instruction defines.
pub fn defined_vars(data: &InstructionData) -> &[Var] {
    &data.results
}
