//! Rewrites an expensive-to-`PUSH` literal operand into a cheaper-to-encode
//! value plus one extra instruction, when doing so is still a net win on
//! code size: a `PUSH32` of a value with many trailing zero bits is
//! replaced with a `PUSH` of the nonzero high bits followed by `shl`, and a
//! `PUSH32` of a value close to the all-ones word is replaced with a `PUSH`
//! of its short bitwise complement followed by `not`. Both rewrites trade
//! one 3-gas opcode for up to 31 bytes of immediate data.
//!
//! This only ever touches literal *operands*, never a literal already
//! reached by some other computation, so it runs late — after constant
//! folding and algebraic simplification have already collapsed anything
//! that would otherwise shrink further on its own.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Inst, InstructionData, Literal, Opcode, Operand, Word};
use crate::passes::trace_pass;

/// Literals of this many bytes or fewer already `PUSH` as cheaply as
/// anything we could rewrite them into; skip the rewrite machinery for them.
const MIN_WORTHWHILE_BYTES: u32 = 4;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    trace_pass!("reduce_literals_codesize", func.name, {
        let mut changed = false;
        let insts: Vec<_> = func.blocks().flat_map(|b| func.layout.block_insts(b).collect::<Vec<_>>()).collect();

        for inst in insts {
            changed |= rewrite_inst_operands(func, inst);
        }

        if changed {
            ac.invalidate_def_use();
        }
        changed
    })
}

fn rewrite_inst_operands(func: &mut Function, inst: Inst) -> bool {
    let data = func.dfg.inst_data(inst).clone();
    let mut changed = false;
    for idx in 0..data.operands.len() {
        let Operand::Literal(lit) = &data.operands[idx] else { continue };
        if byte_len(lit.0) <= MIN_WORTHWHILE_BYTES {
            continue;
        }
        let Some(replacement) = cheaper_form(func, lit.0, inst) else { continue };
        let current = func.dfg.inst_data(inst).clone();
        let mut operands = current.operands.clone();
        operands[idx] = Operand::Var(replacement);
        func.dfg.replace_inst(inst, InstructionData::new(current.opcode, operands, current.results.clone()));
        changed = true;
    }
    changed
}

fn cheaper_form(func: &mut Function, value: Word, before: Inst) -> Option<crate::ir::Var> {
    if let Some((base, shift)) = shl_form(value) {
        let base_var = func.dfg.make_var();
        let base_inst =
            func.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![Operand::Literal(Literal(base))], smallvec![base_var]));
        func.layout.insert_inst_before(base_inst, before);
        let result = func.dfg.make_var();
        let shl_inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Shl,
            smallvec![Operand::Literal(Literal::from_u64(shift as u64)), Operand::Var(base_var)],
            smallvec![result],
        ));
        func.layout.insert_inst_before(shl_inst, before);
        return Some(result);
    }
    if let Some(complement) = not_form(value) {
        let small_var = func.dfg.make_var();
        let small_inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal(complement))],
            smallvec![small_var],
        ));
        func.layout.insert_inst_before(small_inst, before);
        let result = func.dfg.make_var();
        let not_inst =
            func.dfg.make_inst(InstructionData::new(Opcode::Not, smallvec![Operand::Var(small_var)], smallvec![result]));
        func.layout.insert_inst_before(not_inst, before);
        return Some(result);
    }
    None
}

fn byte_len(v: Word) -> u32 {
    if v.is_zero() {
        0
    } else {
        (v.bit_len() as u32 + 7) / 8
    }
}

/// `value == base << shift` for some `base` whose own encoding is at least
/// two bytes shorter than `value`'s (the spare byte pays for the `shl`).
fn shl_form(value: Word) -> Option<(Word, u32)> {
    if value.is_zero() {
        return None;
    }
    let shift = value.trailing_zeros() as u32;
    if shift == 0 {
        return None;
    }
    let base = value >> (shift as usize);
    if byte_len(base) + 2 <= byte_len(value) {
        Some((base, shift))
    } else {
        None
    }
}

/// `value == !complement` for a `complement` whose own encoding is at least
/// two bytes shorter than `value`'s.
fn not_form(value: Word) -> Option<Word> {
    let complement = !value;
    if byte_len(complement) + 2 <= byte_len(value) {
        Some(complement)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Label;

    #[test]
    fn rewrites_trailing_zero_literal_as_shift() {
        let mut func = Function::new(Label::new("f"));
        let b0 = func.dfg.make_block();
        func.layout.append_block(b0);
        let result = func.dfg.make_var();
        // 1 followed by 31 bytes of zeros: a single high bit, cheap as `shl`.
        let big = Word::from(1u64) << 248usize;
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal(big))],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(inst);
        assert!(data.operands[0].as_var().is_some());
    }

    #[test]
    fn leaves_small_literal_alone() {
        let mut func = Function::new(Label::new("f"));
        let b0 = func.dfg.make_block();
        func.layout.append_block(b0);
        let result = func.dfg.make_var();
        let inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(7))],
            smallvec![result],
        ));
        func.layout.append_inst(inst, b0);

        let mut ac = AnalysisCache::new();
        assert!(!run(&mut ac, &mut func));
    }
}
