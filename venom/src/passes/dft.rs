//! Reorders each block's instructions to minimize the stack shuffling the
//! scheduler will need downstream, without changing what the block computes.
//!
//! Two things drive the new order:
//!
//! - Within a block, an instruction is scheduled as late as possible: right
//!   before the instruction (or, for its last operand, the terminator) that
//!   actually needs its result. A depth-first emit starting from each
//!   instruction in original program order, walking operands in *reverse*,
//!   appends every producer just before its consumer — so the value a
//!   multi-operand instruction needs *last* (its rightmost operand, pushed
//!   last onto the stack) ends up computed *last*, arriving already on top.
//! - Across a block boundary, a value consumed soon after the block ends
//!   should also be produced late, so it isn't buried under values computed
//!   after it and dug out with swaps. [`urgency`] estimates "soon" as a
//!   bounded forward walk over the CFG from a variable's definition to its
//!   first use, and instructions with no local successor in the DFS are
//!   visited in order of *decreasing* distance — so the soonest-needed one
//!   is visited, and therefore appended, last.
//!
//! Effect ordering is preserved exactly: every impure instruction is given an
//! implicit dependency on the nearest earlier impure instruction in the same
//! block, so stores and calls can never cross each other no matter how the
//! pure instructions around them move.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::AnalysisCache;
use crate::ir::{Block, Function, Inst, Var};

/// How many blocks the forward search in [`urgency`] will cross looking for
/// a variable's next use before giving up and calling it "never used
/// again". Venom functions are small; this comfortably covers any
/// non-pathological control flow without risking runaway cost on a cyclic
/// CFG.
const MAX_SEARCH_BLOCKS: usize = 64;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let cfg = ac.cfg(func);
    let urgency = urgency(func, &cfg);

    let mut changed = false;
    let blocks: Vec<_> = func.blocks().collect();
    for block in blocks {
        changed |= schedule_block(func, block, &urgency);
    }
    if changed {
        ac.invalidate_def_use();
    }
    changed
}

fn schedule_block(func: &mut Function, block: Block, urgency: &FxHashMap<Var, usize>) -> bool {
    let insts: Vec<Inst> = func.layout.block_insts(block).collect();
    if insts.len() <= 1 {
        return false;
    }

    let mut by_result: FxHashMap<Var, Inst> = FxHashMap::default();
    for &inst in &insts {
        for &r in &func.dfg.inst_data(inst).results {
            by_result.insert(r, inst);
        }
    }

    let mut prev_impure: FxHashMap<Inst, Inst> = FxHashMap::default();
    let mut last_impure: Option<Inst> = None;
    for &inst in &insts {
        if !func.dfg.inst_data(inst).opcode.is_pure() {
            if let Some(p) = last_impure {
                prev_impure.insert(inst, p);
            }
            last_impure = Some(inst);
        }
    }

    let mut visit_order = insts.clone();
    visit_order.sort_by_key(|&inst| {
        let data = func.dfg.inst_data(inst);
        let result_urgency =
            data.results.iter().filter_map(|r| urgency.get(r)).min().copied().unwrap_or(usize::MAX);
        std::cmp::Reverse(result_urgency)
    });

    let mut visited: FxHashSet<Inst> = FxHashSet::default();
    let mut scheduled: Vec<Inst> = Vec::with_capacity(insts.len());
    for inst in visit_order {
        emit(func, inst, &by_result, &prev_impure, &mut visited, &mut scheduled);
    }

    if scheduled == insts {
        return false;
    }

    for &inst in &insts {
        func.layout.remove_inst(inst);
    }
    for inst in &scheduled {
        func.layout.append_inst(*inst, block);
    }
    true
}

fn emit(
    func: &Function,
    inst: Inst,
    by_result: &FxHashMap<Var, Inst>,
    prev_impure: &FxHashMap<Inst, Inst>,
    visited: &mut FxHashSet<Inst>,
    scheduled: &mut Vec<Inst>,
) {
    if !visited.insert(inst) {
        return;
    }
    if let Some(&p) = prev_impure.get(&inst) {
        emit(func, p, by_result, prev_impure, visited, scheduled);
    }
    let data = func.dfg.inst_data(inst).clone();
    for operand in data.operands.iter().rev() {
        if let Some(v) = operand.as_var() {
            if let Some(&producer) = by_result.get(&v) {
                emit(func, producer, by_result, prev_impure, visited, scheduled);
            }
        }
    }
    scheduled.push(inst);
}

/// For every variable defined anywhere in `func`, a rough "instructions
/// until next use" distance: instructions remaining in its own block after
/// its definition, plus a per-block weight for every successor block
/// crossed before a use is found. Not a precise distance (multiple
/// successors are explored independently and the first one to find a use
/// wins), just enough of an ordering to prefer "used soon" over "used
/// later or never" when scheduling a block's own definitions.
fn urgency(func: &Function, cfg: &crate::analysis::ControlFlowGraph) -> FxHashMap<Var, usize> {
    const BLOCK_WEIGHT: usize = 1_000;

    let mut result = FxHashMap::default();
    for block in func.blocks() {
        let insts: Vec<Inst> = func.layout.block_insts(block).collect();
        for (def_idx, &def_inst) in insts.iter().enumerate() {
            for &v in &func.dfg.inst_data(def_inst).results {
                let dist = distance_to_use(func, cfg, block, def_idx, &insts, v);
                if let Some(d) = dist {
                    result.entry(v).and_modify(|cur| *cur = (*cur).min(d)).or_insert(d);
                }
            }
        }
    }
    result
}

fn distance_to_use(
    func: &Function,
    cfg: &crate::analysis::ControlFlowGraph,
    def_block: Block,
    def_idx: usize,
    def_block_insts: &[Inst],
    var: Var,
) -> Option<usize> {
    for (offset, &inst) in def_block_insts.iter().enumerate().skip(def_idx + 1) {
        if func.dfg.inst_operands(inst).iter().any(|o| o.as_var() == Some(var)) {
            return Some(offset - def_idx);
        }
    }

    let mut visited = FxHashSet::default();
    visited.insert(def_block);
    let mut frontier: Vec<Block> = cfg.succ_iter(def_block).collect();
    let mut depth = 1;
    while !frontier.is_empty() && visited.len() < MAX_SEARCH_BLOCKS {
        let mut next = Vec::new();
        for block in frontier {
            if !visited.insert(block) {
                continue;
            }
            for inst in func.layout.block_insts(block) {
                if func.dfg.inst_operands(inst).iter().any(|o| o.as_var() == Some(var)) {
                    return Some(depth * BLOCK_WEIGHT);
                }
            }
            next.extend(cfg.succ_iter(block));
        }
        frontier = next;
        depth += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn schedules_producer_closest_to_its_use() {
        let mut func = Function::new(Label::new("f"));
        let b0 = func.dfg.make_block();
        func.layout.append_block(b0);

        let v1 = func.dfg.make_var();
        let load1 = func.dfg.make_inst(InstructionData::new(
            Opcode::Calldataload,
            smallvec![Operand::Literal(crate::ir::Literal::from_u64(1))],
            smallvec![v1],
        ));
        let v2 = func.dfg.make_var();
        let load2 = func.dfg.make_inst(InstructionData::new(
            Opcode::Calldataload,
            smallvec![Operand::Literal(crate::ir::Literal::from_u64(2))],
            smallvec![v2],
        ));
        let r1 = func.dfg.make_var();
        let add1 = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(crate::ir::Literal::from_u64(1)), Operand::Var(v1)],
            smallvec![r1],
        ));
        let ret = func.dfg.make_inst(InstructionData::new(
            Opcode::Return,
            smallvec![Operand::Var(v2), Operand::Var(r1)],
            Default::default(),
        ));
        func.layout.append_inst(load1, b0);
        func.layout.append_inst(load2, b0);
        func.layout.append_inst(add1, b0);
        func.layout.append_inst(ret, b0);

        let mut ac = AnalysisCache::new();
        run(&mut ac, &mut func);

        let order: Vec<_> = func.layout.block_insts(b0).collect();
        // The `return`'s last operand is `r1` (via `v1`), so `v1`'s load and
        // its consumer should land immediately before `return`; `v2`'s load,
        // needed first on the stack for `return`'s first operand, is free to
        // move earlier.
        assert_eq!(*order.last().unwrap(), ret);
    }
}
