//! Recognizes a run of word-at-a-time copies — `mload src; mstore dst, %v`
//! repeated with `src`/`dst` each advancing by 32 bytes — and merges the
//! whole run into a single `mcopy dst, src, len`. Two or more consecutive
//! pairs are required before merging; a lone pair is already minimal.

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Inst, InstructionData, Literal, Opcode, Operand, Var};

const WORD: u64 = 32;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    for block in func.blocks() {
        loop {
            let use_count = count_uses(func);
            let insts: Vec<_> = func.layout.block_insts(block).collect();
            let Some((start, run)) = find_mergeable_run(func, &insts, &use_count) else { break };

            let (first_load, first_store) = run[0];
            let dst0 = func.dfg.inst_data(first_store).operands[0].clone();
            let src0 = func.dfg.inst_data(first_load).operands[0].clone();
            let len = Literal::from_u64(run.len() as u64 * WORD);

            func.dfg.replace_inst(
                first_store,
                InstructionData::new(
                    Opcode::Mcopy,
                    smallvec![dst0, src0, Operand::Literal(len)],
                    Default::default(),
                ),
            );
            func.layout.remove_inst(first_load);
            for &(ld, st) in &run[1..] {
                func.layout.remove_inst(ld);
                func.layout.remove_inst(st);
            }
            changed = true;
            let _ = start;
        }
    }
    if changed {
        ac.invalidate_def_use();
        ac.invalidate_memory();
    }
    changed
}

fn count_uses(func: &Function) -> FxHashMap<Var, u32> {
    let mut counts = FxHashMap::default();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            for v in func.dfg.inst_operands(inst).iter().filter_map(|o| o.as_var()) {
                *counts.entry(v).or_default() += 1;
            }
        }
    }
    counts
}

/// A "pair" is an `mload` immediately followed by an `mstore` of exactly its
/// result, with that result used nowhere else. Returns the first pair's
/// index in `insts` and the full run once two or more consecutive pairs'
/// addresses advance by exactly one word each.
fn find_mergeable_run(
    func: &Function,
    insts: &[Inst],
    use_count: &FxHashMap<Var, u32>,
) -> Option<(usize, Vec<(Inst, Inst)>)> {
    let mut i = 0;
    while i + 1 < insts.len() {
        if let Some(pair) = as_pair(func, insts[i], insts[i + 1], use_count) {
            let mut run = vec![pair];
            let mut next = i + 2;
            loop {
                let Some((dst_base, src_base)) = addrs(func, run.last().unwrap()) else { break };
                if next + 1 >= insts.len() {
                    break;
                }
                let Some(candidate) = as_pair(func, insts[next], insts[next + 1], use_count) else { break };
                let Some((dst_next, src_next)) = addrs(func, &candidate) else { break };
                if dst_next == dst_base + WORD && src_next == src_base + WORD {
                    run.push(candidate);
                    next += 2;
                } else {
                    break;
                }
            }
            if run.len() >= 2 {
                return Some((i, run));
            }
        }
        i += 1;
    }
    None
}

fn as_pair(func: &Function, a: Inst, b: Inst, use_count: &FxHashMap<Var, u32>) -> Option<(Inst, Inst)> {
    let load = func.dfg.inst_data(a);
    if load.opcode != Opcode::Mload {
        return None;
    }
    let loaded = load.result()?;
    let store = func.dfg.inst_data(b);
    if store.opcode != Opcode::Mstore {
        return None;
    }
    if store.operands[1].as_var() != Some(loaded) {
        return None;
    }
    if use_count.get(&loaded).copied().unwrap_or(0) != 1 {
        return None;
    }
    Some((a, b))
}

fn addrs(func: &Function, &(load, store): &(Inst, Inst)) -> Option<(u64, u64)> {
    let src = func.dfg.inst_data(load).operands[0].as_literal()?.0;
    let dst = func.dfg.inst_data(store).operands[0].as_literal()?.0;
    Some((u64::try_from(dst).ok()?, u64::try_from(src).ok()?))
}
