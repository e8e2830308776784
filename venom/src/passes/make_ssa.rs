//! Converts a function out of the frontend's "named variable, possibly
//! reassigned along different paths" form into strict SSA: every variable
//! gets exactly one definition, and control-flow merges get explicit `phi`
//! instructions.
//!
//! This is Cytron, Ferrante, Rosen, Wegman & Zadeck's algorithm: place a phi
//! at the iterated dominance frontier of each reassigned variable's
//! definition sites, then rename by walking the dominator tree, maintaining
//! a definition stack per original variable and rewriting every use to the
//! stack's current top. `PhiEliminationPass` is the pass that reverses
//! this — it isn't undone here.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::{Block, Function, InstructionData, Label, Opcode, Operand, Var};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let Some(entry) = func.entry_block() else { return false };
    let cfg = ac.cfg(func);
    let domtree = ac.domtree(func);
    let var_def = crate::analysis::VarDefinition::compute(func);

    let needs_ssa: Vec<Var> = var_def.multiply_defined_vars().collect();
    if needs_ssa.is_empty() {
        return false;
    }

    // 1. Phi placement at the iterated dominance frontier of each
    // multiply-defined variable's definition blocks.
    let mut phi_result: FxHashMap<(Block, Var), Var> = FxHashMap::default();
    for &var in &needs_ssa {
        let mut has_phi: FxHashSet<Block> = FxHashSet::default();
        let mut worklist: Vec<Block> = var_def.def_blocks(var).to_vec();
        while let Some(b) = worklist.pop() {
            for &d in domtree.dominance_frontier(b) {
                if has_phi.insert(d) {
                    let phi_var = func.dfg.make_var();
                    let inst = func.dfg.make_inst(InstructionData::new(
                        Opcode::Phi,
                        Default::default(),
                        smallvec![phi_var],
                    ));
                    match func.layout.block_insts(d).next() {
                        Some(first) => func.layout.insert_inst_before(inst, first),
                        None => func.layout.append_inst(inst, d),
                    }
                    phi_result.insert((d, var), phi_var);
                    worklist.push(d);
                }
            }
        }
    }

    // 2. Build the dominator-tree children lists for the renaming walk.
    let mut children: FxHashMap<Block, Vec<Block>> = FxHashMap::default();
    for block in func.blocks() {
        if !domtree.is_reachable(block) {
            continue;
        }
        if let Some(idom) = domtree.idom(block) {
            if idom != block {
                children.entry(idom).or_default().push(block);
            }
        }
    }

    let mut stacks: FxHashMap<Var, Vec<Var>> = FxHashMap::default();
    rename(func, &cfg, &children, &phi_result, &needs_ssa.iter().copied().collect(), entry, &mut stacks);

    ac.invalidate_def_use();
    true
}

fn rename(
    func: &mut Function,
    cfg: &crate::analysis::ControlFlowGraph,
    children: &FxHashMap<Block, Vec<Block>>,
    phi_result: &FxHashMap<(Block, Var), Var>,
    needs_ssa: &FxHashSet<Var>,
    block: Block,
    stacks: &mut FxHashMap<Var, Vec<Var>>,
) {
    let mut pushed: Vec<Var> = Vec::new();

    let insts: Vec<_> = func.layout.block_insts(block).collect();
    for inst in insts {
        let is_phi = func.dfg.opcode(inst) == Opcode::Phi;
        // Rewrite uses first (a phi's own result must not rewrite its not-
        // yet-filled operands, and non-phi instructions never use a value
        // they also define).
        if !is_phi {
            let data = func.dfg.inst_data_mut(inst);
            for op in data.operands.iter_mut() {
                if let Operand::Var(v) = op {
                    if needs_ssa.contains(v) {
                        if let Some(top) = stacks.get(v).and_then(|s| s.last()) {
                            *op = Operand::Var(*top);
                        }
                    }
                }
            }
        }
        if !is_phi {
            let results: Vec<Var> = func.dfg.inst_data(inst).results.to_vec();
            for (index, original) in results.into_iter().enumerate() {
                if needs_ssa.contains(&original) {
                    let fresh = func.dfg.make_var();
                    func.dfg.rename_result(inst, index, fresh);
                    stacks.entry(original).or_default().push(fresh);
                    pushed.push(original);
                }
            }
        }
    }

    // Phis placed directly in this block already got their own fresh result
    // var at insertion time; just make it the current definition.
    for inst in func.layout.block_insts(block) {
        if func.dfg.opcode(inst) != Opcode::Phi {
            continue;
        }
        let phi_var = func.dfg.inst_data(inst).result().unwrap();
        if let Some((&(_, original), _)) =
            phi_result.iter().find(|((b, _), &v)| *b == block && v == phi_var)
        {
            stacks.entry(original).or_default().push(phi_var);
            pushed.push(original);
        }
    }

    // Fill phi operands in every CFG successor that has one for a variable
    // currently live on our stacks.
    let label_of = |b: Block, f: &Function| f.dfg.block_label(b).cloned().unwrap_or_else(|| Label::new(format!("bb{}", b.as_u32())));
    let my_label = label_of(block, func);
    for succ in cfg.succ_iter(block).collect::<Vec<_>>() {
        for (&(b, original), &phi_var) in phi_result.iter() {
            if b != succ {
                continue;
            }
            let reaching = stacks.get(&original).and_then(|s| s.last()).copied().unwrap_or(original);
            if let Some(phi_inst) = func
                .layout
                .block_insts(succ)
                .find(|&i| func.dfg.inst_data(i).result() == Some(phi_var))
            {
                let data = func.dfg.inst_data_mut(phi_inst);
                let already_has_pred = data.phi_args().any(|(l, _)| *l == my_label);
                if !already_has_pred {
                    data.push_phi_arg(my_label.clone(), reaching);
                }
            }
        }
    }

    for &child in children.get(&block).into_iter().flatten() {
        rename(func, cfg, children, phi_result, needs_ssa, child, stacks);
    }

    for original in pushed {
        stacks.get_mut(&original).unwrap().pop();
    }
}
