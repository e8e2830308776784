//! Algebraic identity simplification: rewrites an instruction in place to a
//! cheaper equivalent whenever one operand is a recognizable identity
//! element, independent of whether the other operand is known at compile
//! time (that case is [`crate::passes::sccp`]'s job). Each rule turns an
//! instruction into either a plain `assign` of its surviving operand or a
//! cheaper opcode (`mul` by a power of two into `shl`).

use crate::analysis::AnalysisCache;
use crate::ir::{Function, InstructionData, Literal, Opcode, Operand};
use smallvec::smallvec;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let insts: Vec<_> = func.blocks().flat_map(|b| func.layout.block_insts(b).collect::<Vec<_>>()).collect();
    for inst in insts {
        let data = func.dfg.inst_data(inst).clone();
        let Some(result) = data.result() else { continue };
        if let Some(simplified) = simplify(&data) {
            func.dfg.replace_inst(
                inst,
                InstructionData::new(Opcode::Assign, smallvec![simplified], smallvec![result]),
            );
            changed = true;
        } else if let Some((op, operands)) = strength_reduce(&data) {
            func.dfg.replace_inst(inst, InstructionData::new(op, operands, smallvec![result]));
            changed = true;
        }
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}

/// Rules that collapse an instruction down to a single surviving operand.
fn simplify(data: &InstructionData) -> Option<Operand> {
    let ops = &data.operands;
    let same_operand = ops.len() == 2 && ops[0] == ops[1];
    match data.opcode {
        Opcode::Sub | Opcode::Xor if same_operand => Some(Operand::Literal(Literal::zero())),
        Opcode::Add | Opcode::Or | Opcode::Xor if ops.len() == 2 => {
            if ops[1].as_literal().is_some_and(Literal::is_zero) {
                Some(ops[0].clone())
            } else if ops[0].as_literal().is_some_and(Literal::is_zero) {
                Some(ops[1].clone())
            } else {
                None
            }
        }
        Opcode::Sub if ops.len() == 2 => ops[1].as_literal().is_some_and(Literal::is_zero).then(|| ops[0].clone()),
        Opcode::Mul if ops.len() == 2 => {
            if ops[1].as_literal().is_some_and(Literal::is_one) {
                Some(ops[0].clone())
            } else if ops[0].as_literal().is_some_and(Literal::is_one) {
                Some(ops[1].clone())
            } else if ops[0].as_literal().is_some_and(Literal::is_zero)
                || ops[1].as_literal().is_some_and(Literal::is_zero)
            {
                Some(Operand::Literal(Literal::zero()))
            } else {
                None
            }
        }
        Opcode::Div | Opcode::Sdiv if ops.len() == 2 => {
            ops[1].as_literal().is_some_and(Literal::is_one).then(|| ops[0].clone())
        }
        Opcode::And if ops.len() == 2 => {
            if ops[0].as_literal().is_some_and(Literal::is_zero)
                || ops[1].as_literal().is_some_and(Literal::is_zero)
            {
                Some(Operand::Literal(Literal::zero()))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Rules that replace an instruction with a cheaper opcode of the same
/// arity: multiplying or dividing by a power of two becomes a shift.
fn strength_reduce(data: &InstructionData) -> Option<(Opcode, crate::ir::OperandList)> {
    let ops = &data.operands;
    match data.opcode {
        Opcode::Mul if ops.len() == 2 => {
            let (lit_idx, other_idx) = if ops[1].is_literal() { (1, 0) } else { (0, 1) };
            let exponent = ops[lit_idx].as_literal()?.pow2_exponent()?;
            Some((Opcode::Shl, smallvec![Operand::Literal(Literal::from_u64(exponent as u64)), ops[other_idx].clone()]))
        }
        Opcode::Div if ops.len() == 2 => {
            let exponent = ops[1].as_literal()?.pow2_exponent()?;
            Some((Opcode::Shr, smallvec![Operand::Literal(Literal::from_u64(exponent as u64)), ops[0].clone()]))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Label, Var};

    fn make_add_zero() -> (Function, crate::ir::Inst, Var) {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);
        let src = func.dfg.append_block_param(b0);
        let result = func.dfg.make_var();
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Var(src), Operand::Literal(Literal::zero())],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);
        (func, inst, src)
    }

    #[test]
    fn add_zero_becomes_assign() {
        let (mut func, inst, src) = make_add_zero();
        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(inst);
        assert_eq!(data.opcode, Opcode::Assign);
        assert_eq!(data.operands[0].as_var(), Some(src));
    }

    #[test]
    fn sub_of_a_variable_with_itself_folds_to_zero() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);
        let p = func.dfg.append_block_param(b0);
        let result = func.dfg.make_var();
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Sub,
            smallvec![Operand::Var(p), Operand::Var(p)],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(inst);
        assert_eq!(data.opcode, Opcode::Assign);
        assert!(data.operands[0].as_literal().is_some_and(Literal::is_zero));
    }

    #[test]
    fn xor_of_a_variable_with_itself_folds_to_zero() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);
        let p = func.dfg.append_block_param(b0);
        let result = func.dfg.make_var();
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Xor,
            smallvec![Operand::Var(p), Operand::Var(p)],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(inst);
        assert_eq!(data.opcode, Opcode::Assign);
        assert!(data.operands[0].as_literal().is_some_and(Literal::is_zero));
    }
}
