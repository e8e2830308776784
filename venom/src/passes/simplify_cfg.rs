//! Canonicalizes the control-flow graph: removes blocks unreachable from
//! the entry, folds a `jnz` whose condition is a literal into an
//! unconditional `jmp`, and merges a block into its sole predecessor when
//! that predecessor has no other successor.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Label, Opcode, Operand};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    changed |= fold_constant_branches(func);
    changed |= remove_unreachable_blocks(ac, func);
    changed |= merge_straight_line_blocks(ac, func);
    if changed {
        ac.invalidate_cfg();
    }
    changed
}

fn fold_constant_branches(func: &mut Function) -> bool {
    let mut changed = false;
    let blocks: Vec<_> = func.blocks().collect();
    for block in blocks {
        let Some(term) = func.layout.last_inst(block) else { continue };
        let data = func.dfg.inst_data(term);
        if data.opcode != Opcode::Jnz {
            continue;
        }
        let Some(lit) = data.operands[0].as_literal() else { continue };
        let taken = if !lit.is_zero() { data.operands[1].clone() } else { data.operands[2].clone() };
        let new_data = crate::ir::InstructionData::new(Opcode::Jmp, smallvec::smallvec![taken], Default::default());
        func.dfg.replace_inst(term, new_data);
        changed = true;
    }
    changed
}

fn remove_unreachable_blocks(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let Some(entry) = func.entry_block() else { return false };
    let cfg = ac.cfg(func);
    let mut reachable = rustc_hash::FxHashSet::default();
    let mut stack = vec![entry];
    reachable.insert(entry);
    while let Some(b) = stack.pop() {
        for s in cfg.succ_iter(b) {
            if reachable.insert(s) {
                stack.push(s);
            }
        }
    }
    let to_remove: Vec<_> = func.blocks().filter(|b| !reachable.contains(b)).collect();
    for block in &to_remove {
        let insts: Vec<_> = func.layout.block_insts(*block).collect();
        for i in insts {
            func.layout.remove_inst(i);
        }
        func.layout.remove_block(*block);
    }
    !to_remove.is_empty()
}

/// Merge `block` into `pred` when `pred`'s only successor is `block` and
/// `block`'s only predecessor is `pred`: splice `block`'s instructions onto
/// the end of `pred` (dropping `pred`'s now-redundant `jmp` terminator) and
/// remove `block`.
fn merge_straight_line_blocks(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let cfg = ac.cfg(func);
        let mut candidate = None;
        for block in func.blocks() {
            if cfg.pred_count(block) != 1 {
                continue;
            }
            let pred = cfg.pred_iter(block).next().unwrap().block;
            if pred == block || cfg.succ_count(pred) != 1 {
                continue;
            }
            if func.dfg.block_params(block).is_empty() {
                candidate = Some((pred, block));
                break;
            }
        }
        let Some((pred, block)) = candidate else { break };
        let term = func.layout.last_inst(pred).unwrap();
        func.layout.remove_inst(term);
        let insts: Vec<_> = func.layout.block_insts(block).collect();
        for inst in insts {
            func.layout.remove_inst(inst);
            func.layout.append_inst(inst, pred);
        }
        // Retarget any phi in a successor of `block` that names `block` as
        // its predecessor to name `pred` instead.
        let block_label = func.dfg.block_label(block).cloned();
        if let Some(label) = block_label {
            let pred_label = match func.dfg.block_label(pred).cloned() {
                Some(l) => l,
                None => {
                    let fresh: Label = format!("bb{}", pred.as_u32()).into();
                    func.dfg.set_block_label(pred, fresh.clone());
                    fresh
                }
            };
            let others: Vec<_> = func.blocks().collect();
            for other in others {
                let insts: Vec<_> = func.layout.block_insts(other).collect();
                for inst in insts {
                    if func.dfg.opcode(inst) != Opcode::Phi {
                        continue;
                    }
                    let data = func.dfg.inst_data_mut(inst);
                    for op in data.operands.iter_mut() {
                        if let Operand::Label(l) = op {
                            if *l == label {
                                *l = pred_label.clone();
                            }
                        }
                    }
                }
            }
        }
        func.layout.remove_block(block);
        ac.invalidate_cfg();
        changed = true;
    }
    changed
}
