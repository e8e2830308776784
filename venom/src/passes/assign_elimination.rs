//! Collapses `assign` copies: `%b = assign %a` is replaced everywhere by a
//! direct use of `%a`, and the assign is deleted (`RemoveUnusedVariablesPass`
//! or this pass's own final sweep clears out anything left with no uses).
//! Chains of assigns (`%c = assign %b`, `%b = assign %a`) are followed to
//! their root so a single pass fully collapses them instead of needing to
//! run to a fixed point itself.

use crate::analysis::AnalysisCache;
use crate::ir::{Function, Opcode, Var};
use rustc_hash::FxHashMap;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut root: FxHashMap<Var, Var> = FxHashMap::default();
    let mut to_remove = Vec::new();

    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            if data.opcode != Opcode::Assign {
                continue;
            }
            let Some(result) = data.result() else { continue };
            let Some(src) = data.operands.first().and_then(|o| o.as_var()) else { continue };
            if src == result {
                continue;
            }
            root.insert(result, src);
            to_remove.push(inst);
        }
    }

    if root.is_empty() {
        return false;
    }

    let resolve = |mut v: Var, root: &FxHashMap<Var, Var>| {
        let mut seen = 0;
        while let Some(&next) = root.get(&v) {
            if seen > root.len() {
                break; // defensive: a cycle, should not occur in valid IR.
            }
            v = next;
            seen += 1;
        }
        v
    };

    for (&result, _) in root.clone().iter() {
        let canonical = resolve(result, &root);
        func.dfg.replace_all_uses(result, canonical);
    }

    for inst in to_remove {
        func.layout.remove_inst(inst);
    }

    ac.invalidate_def_use();
    true
}
