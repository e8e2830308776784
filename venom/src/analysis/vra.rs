//! Value range analysis: a conservative `[lo, hi]` interval per variable,
//! used by `OverflowElimination`/`AssertElimination` to prove an `assert`
//! can never fire (and is therefore dead) or that an arithmetic op cannot
//! overflow.
//!
//! Blocks are visited in reverse-postorder so every definition is processed
//! before its uses along acyclic flow; a value reachable only through a
//! loop back-edge keeps its def site's range (not re-widened each
//! iteration), which is conservative — it can fail to prove some true facts
//! about loop-carried values — but never unsound, matching the "materialize
//! once, don't iterate to a fixed point unless the dataflow genuinely needs
//! it" discipline the rest of the analyses in this crate follow.

use alloy_primitives::U256;

use crate::analysis::{cfg::ControlFlowGraph, dominators::DominatorTree};
use crate::entity::SecondaryMap;
use crate::ir::{Function, Opcode, Operand, Var};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub lo: U256,
    pub hi: U256,
}

impl Range {
    pub const FULL: Range = Range { lo: U256::ZERO, hi: U256::MAX };

    pub fn exact(v: U256) -> Self {
        Range { lo: v, hi: v }
    }

    pub fn is_exact_zero(&self) -> bool {
        self.lo.is_zero() && self.hi.is_zero()
    }

    pub fn cannot_be_zero(&self) -> bool {
        self.lo > U256::ZERO
    }

    fn union(a: Range, b: Range) -> Range {
        Range { lo: a.lo.min(b.lo), hi: a.hi.max(b.hi) }
    }

    fn add(a: Range, b: Range) -> Range {
        match a.hi.checked_add(b.hi) {
            Some(hi) => Range { lo: a.lo.saturating_add(b.lo), hi },
            None => Range::FULL,
        }
    }

    fn mul(a: Range, b: Range) -> Range {
        match a.hi.checked_mul(b.hi) {
            Some(hi) => Range { lo: a.lo.saturating_mul(b.lo), hi },
            None => Range::FULL,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValueRangeAnalysis {
    ranges: SecondaryMap<Var, Option<Range>>,
}

impl ValueRangeAnalysis {
    pub fn compute(func: &Function, _cfg: &ControlFlowGraph, domtree: &DominatorTree) -> Self {
        let mut vra = ValueRangeAnalysis::default();
        for block in domtree.reverse_postorder() {
            for inst in func.layout.block_insts(block) {
                let data = func.dfg.inst_data(inst);
                let Some(result) = data.result() else { continue };
                let operand_range = |op: &Operand| -> Range {
                    match op {
                        Operand::Literal(lit) => Range::exact(lit.0),
                        Operand::Var(v) => vra.range(*v).unwrap_or(Range::FULL),
                        Operand::Label(_) => Range::FULL,
                    }
                };
                let range = match data.opcode {
                    Opcode::Add if data.operands.len() == 2 => {
                        Range::add(operand_range(&data.operands[0]), operand_range(&data.operands[1]))
                    }
                    Opcode::Mul if data.operands.len() == 2 => {
                        Range::mul(operand_range(&data.operands[0]), operand_range(&data.operands[1]))
                    }
                    Opcode::Iszero if data.operands.len() == 1 => {
                        let r = operand_range(&data.operands[0]);
                        if r.is_exact_zero() {
                            Range::exact(U256::from(1u64))
                        } else if r.cannot_be_zero() {
                            Range::exact(U256::ZERO)
                        } else {
                            Range { lo: U256::ZERO, hi: U256::from(1u64) }
                        }
                    }
                    Opcode::Assign if data.operands.len() == 1 => operand_range(&data.operands[0]),
                    Opcode::Phi => {
                        let mut acc: Option<Range> = None;
                        for (_, v) in data.phi_args() {
                            let r = vra.range(v).unwrap_or(Range::FULL);
                            acc = Some(match acc {
                                None => r,
                                Some(a) => Range::union(a, r),
                            });
                        }
                        acc.unwrap_or(Range::FULL)
                    }
                    _ => Range::FULL,
                };
                *vra.ranges.get_mut(result) = Some(range);
            }
        }
        vra
    }

    pub fn range(&self, var: Var) -> Option<Range> {
        *self.ranges.get(var)
    }
}
