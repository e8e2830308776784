//! Loop-invariant code motion: hoists an instruction out of a natural loop
//! into the loop's preheader when every operand it reads is defined outside
//! the loop body and its effects don't conflict with anything the loop body
//! does. A pure instruction always qualifies; a load additionally qualifies
//! when no instruction left in the body writes to the load's address space
//! (a storage read hoists past a loop that only ever reads storage, but not
//! past one that also writes it).
//!
//! A natural loop is identified the standard way: a back edge is a CFG edge
//! `latch -> header` where `header` dominates `latch`; the loop body is
//! every block that can reach `latch` without leaving through `header`.
//! Hoisting only happens when `header` already has a single predecessor
//! outside the loop to hoist into — this pass does not synthesize a new
//! preheader block, so a header reached by more than one outside edge (a
//! shape `SimplifyCFGPass`'s block merging does not always remove) is left
//! alone, a conservative simplification.

use rustc_hash::FxHashSet;

use crate::analysis::AnalysisCache;
use crate::ir::{opcode_effects, Block, EffectSet, Function};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let cfg = ac.cfg(func);
    let domtree = ac.domtree(func);

    let mut back_edges = Vec::new();
    for block in func.blocks() {
        for pred in cfg.pred_iter(block) {
            if domtree.dominates(block, pred.block) {
                back_edges.push((pred.block, block));
            }
        }
    }

    let mut changed = false;
    for (latch, header) in back_edges {
        let mut body: FxHashSet<Block> = FxHashSet::default();
        body.insert(header);
        let mut stack = vec![latch];
        body.insert(latch);
        while let Some(b) = stack.pop() {
            for pred in cfg.pred_iter(b) {
                if body.insert(pred.block) {
                    stack.push(pred.block);
                }
            }
        }

        let outside_preds: Vec<_> = cfg.pred_iter(header).filter(|p| !body.contains(&p.block)).collect();
        let [preheader] = outside_preds.as_slice() else { continue };
        let preheader = preheader.block;
        let Some(preheader_term) = func.layout.last_inst(preheader) else { continue };

        let mut body_blocks: Vec<_> = body.iter().copied().filter(|&b| b != header).collect();
        body_blocks.sort_by_key(|b| b.as_u32());
        body_blocks.insert(0, header);

        // Aggregate over the whole body once: a store is never itself
        // hoisted (it isn't pure and isn't a load), so this doesn't need
        // recomputing as hoisting proceeds.
        let body_effects = body_blocks.iter().flat_map(|&b| func.layout.block_insts(b)).fold(
            EffectSet::empty(),
            |acc, inst| acc.union(opcode_effects(func.dfg.inst_data(inst).opcode)),
        );

        loop {
            let mut hoisted_any = false;
            for &block in &body_blocks {
                let insts: Vec<_> = func.layout.block_insts(block).collect();
                for inst in insts {
                    let data = func.dfg.inst_data(inst);
                    let hoistable = data.opcode.is_pure()
                        || (data.opcode.can_load() && !opcode_effects(data.opcode).conflicts_with(&body_effects));
                    if !hoistable {
                        continue;
                    }
                    let all_outside = data.operands.iter().filter_map(|o| o.as_var()).all(|v| {
                        func.dfg
                            .value_def(v)
                            .map(|def| !body.contains(&def_block(&def, func)))
                            .unwrap_or(true)
                    });
                    if !all_outside {
                        continue;
                    }
                    func.layout.remove_inst(inst);
                    func.layout.insert_inst_before(inst, preheader_term);
                    changed = true;
                    hoisted_any = true;
                }
            }
            if !hoisted_any {
                break;
            }
        }
    }

    if changed {
        ac.invalidate_def_use();
    }
    changed
}

fn def_block(def: &crate::ir::ValueDef, func: &Function) -> Block {
    match *def {
        crate::ir::ValueDef::Result(inst, _) => func.layout.inst_block(inst).expect("defining instruction must be in layout"),
        crate::ir::ValueDef::BlockParam(block, _) => block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn storage_read_hoisted_out_of_a_loop_that_never_writes_storage() {
        let mut func = Function::new(Label::new("f"));
        let entry = func.dfg.make_block();
        let header = func.dfg.make_block();
        let exit = func.dfg.make_block();
        func.dfg.set_block_label(entry, Label::new("entry"));
        func.dfg.set_block_label(header, Label::new("header"));
        func.dfg.set_block_label(exit, Label::new("exit"));
        func.layout.append_block(entry);
        func.layout.append_block(header);
        func.layout.append_block(exit);

        let jmp = func.dfg.make_inst(InstructionData::new(
            Opcode::Jmp,
            smallvec![Operand::Label(Label::new("header"))],
            Default::default(),
        ));
        func.layout.append_inst(jmp, entry);

        let v = func.dfg.make_var();
        let sload = func.dfg.make_inst(InstructionData::new(
            Opcode::Sload,
            smallvec![Operand::Literal(Literal::from_u64(0))],
            smallvec![v],
        ));
        func.layout.append_inst(sload, header);
        let jnz = func.dfg.make_inst(InstructionData::new(
            Opcode::Jnz,
            smallvec![Operand::Var(v), Operand::Label(Label::new("header")), Operand::Label(Label::new("exit"))],
            Default::default(),
        ));
        func.layout.append_inst(jnz, header);

        let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop, exit);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        assert_eq!(func.layout.inst_block(sload), Some(entry));
        assert!(func.layout.block_insts(header).collect::<Vec<_>>() == vec![jnz]);
    }

    #[test]
    fn storage_read_not_hoisted_out_of_a_loop_that_also_writes_storage() {
        let mut func = Function::new(Label::new("f"));
        let entry = func.dfg.make_block();
        let header = func.dfg.make_block();
        let exit = func.dfg.make_block();
        func.dfg.set_block_label(entry, Label::new("entry"));
        func.dfg.set_block_label(header, Label::new("header"));
        func.dfg.set_block_label(exit, Label::new("exit"));
        func.layout.append_block(entry);
        func.layout.append_block(header);
        func.layout.append_block(exit);

        let jmp = func.dfg.make_inst(InstructionData::new(
            Opcode::Jmp,
            smallvec![Operand::Label(Label::new("header"))],
            Default::default(),
        ));
        func.layout.append_inst(jmp, entry);

        let v = func.dfg.make_var();
        let sload = func.dfg.make_inst(InstructionData::new(
            Opcode::Sload,
            smallvec![Operand::Literal(Literal::from_u64(0))],
            smallvec![v],
        ));
        func.layout.append_inst(sload, header);
        let sstore = func.dfg.make_inst(InstructionData::new(
            Opcode::Sstore,
            smallvec![Operand::Literal(Literal::from_u64(1)), Operand::Var(v)],
            Default::default(),
        ));
        func.layout.append_inst(sstore, header);
        let jnz = func.dfg.make_inst(InstructionData::new(
            Opcode::Jnz,
            smallvec![Operand::Var(v), Operand::Label(Label::new("header")), Operand::Label(Label::new("exit"))],
            Default::default(),
        ));
        func.layout.append_inst(jnz, header);

        let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop, exit);

        let mut ac = AnalysisCache::new();
        assert!(!run(&mut ac, &mut func));
        assert_eq!(func.layout.inst_block(sload), Some(header));
    }
}
