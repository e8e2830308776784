//! Sparse conditional constant propagation's constant-folding half: any pure
//! instruction all of whose operands are already literals is evaluated and
//! replaced with an `assign` of the resulting literal. The "conditional"
//! half — proving a branch's direction statically and deleting the
//! unreachable side — is [`crate::passes::simplify_cfg::fold_constant_branches`];
//! this pass only needs to run before it so a branch whose condition was
//! folded to a literal here gets picked up there. Splitting sparse
//! propagation into these two passes, rather than one combined worklist
//! algorithm, keeps each one small enough to reason about in isolation.

use alloy_primitives::U256;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, InstructionData, Literal, Opcode};
use smallvec::smallvec;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let insts: Vec<_> = func.blocks().flat_map(|b| func.layout.block_insts(b).collect::<Vec<_>>()).collect();
    for inst in insts {
        let data = func.dfg.inst_data(inst).clone();
        let Some(result) = data.result() else { continue };
        if data.results.len() != 1 || !data.opcode.is_pure() {
            continue;
        }
        let Some(literals): Option<Vec<U256>> = data.operands.iter().map(|o| o.as_literal().map(|l| l.0)).collect()
        else {
            continue;
        };
        let Some(folded) = fold(data.opcode, &literals) else { continue };
        func.dfg.replace_inst(
            inst,
            InstructionData::new(
                Opcode::Assign,
                smallvec![crate::ir::Operand::Literal(Literal(folded))],
                smallvec![result],
            ),
        );
        changed = true;
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}

fn fold(opcode: Opcode, ops: &[U256]) -> Option<U256> {
    match (opcode, ops) {
        (Opcode::Add, [a, b]) => Some(a.overflowing_add(*b).0),
        (Opcode::Sub, [a, b]) => Some(a.overflowing_sub(*b).0),
        (Opcode::Mul, [a, b]) => Some(a.overflowing_mul(*b).0),
        (Opcode::Div, [a, b]) => Some(if b.is_zero() { U256::ZERO } else { a / b }),
        (Opcode::Mod, [a, b]) => Some(if b.is_zero() { U256::ZERO } else { a % b }),
        (Opcode::And, [a, b]) => Some(a & b),
        (Opcode::Or, [a, b]) => Some(a | b),
        (Opcode::Xor, [a, b]) => Some(a ^ b),
        (Opcode::Not, [a]) => Some(!*a),
        (Opcode::Eq, [a, b]) => Some(bool_word(a == b)),
        (Opcode::Lt, [a, b]) => Some(bool_word(a < b)),
        (Opcode::Gt, [a, b]) => Some(bool_word(a > b)),
        (Opcode::Iszero, [a]) => Some(bool_word(a.is_zero())),
        (Opcode::Shl, [shift, a]) => Some(checked_shl(*a, *shift)),
        (Opcode::Shr, [shift, a]) => Some(checked_shr(*a, *shift)),
        _ => None,
    }
}

fn bool_word(b: bool) -> U256 {
    if b { U256::from(1u64) } else { U256::ZERO }
}

fn checked_shl(a: U256, shift: U256) -> U256 {
    if shift >= U256::from(256u64) { U256::ZERO } else { a << (shift.as_limbs()[0] as usize) }
}

fn checked_shr(a: U256, shift: U256) -> U256 {
    if shift >= U256::from(256u64) { U256::ZERO } else { a >> (shift.as_limbs()[0] as usize) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Label, Opcode, Operand};

    #[test]
    fn folds_constant_add() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);
        let result = func.dfg.make_var();
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(Literal::from_u64(2)), Operand::Literal(Literal::from_u64(3))],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(inst);
        assert_eq!(data.opcode, Opcode::Assign);
        assert_eq!(data.operands[0].as_literal().unwrap().0, U256::from(5u64));
    }
}
