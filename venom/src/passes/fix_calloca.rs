//! Finalizes every `calloca` — a caller-side scratch slot reserved for the
//! packed memory arguments of a call, sized before the frontend could know
//! the callee's actual parameter count — now that every function in the
//! [`Context`] exists and can be looked up by name.
//!
//! A `calloca`'s third operand names the callee it was reserved for (unlike
//! a plain `alloca`, which leaves that operand unused, or a `palloca`, which
//! uses it for the incoming parameter's index). This pass resolves that
//! label, reads the callee's parameter count, and writes the resulting byte
//! size into both the instruction's size operand and the
//! [`AbstractMemLoc`]'s own size field that [`crate::passes::concretize_memloc`]
//! will bump-allocate against — so by the time that pass runs, `calloca` is
//! just an `alloca` with a now-correct size.
//!
//! Runs once, globally, before the inliner: the inliner duplicates callee
//! bodies (including any `calloca`s inside them) into callers, and does so
//! assuming every `calloca` it copies already carries its final size.

use smallvec::smallvec;

use crate::ir::{
    AbstractMemLoc, Context, FuncId, Inst, InstructionData, Label, Literal, MemLocId, Opcode, Operand,
};

pub fn run(ctx: &mut Context) -> bool {
    let mut changed = false;
    let func_ids: Vec<FuncId> = ctx.function_ids().collect();

    for fid in func_ids {
        let targets = collect_calloca_sites(ctx.function(fid));
        for (inst, callee_label, memloc) in targets {
            let Some(callee_id) = ctx.function_by_name(&callee_label) else { continue };
            let size_bytes = (ctx.function(callee_id).params.len() as u64) * 32;

            let func = ctx.function_mut(fid);
            let existing = func.mem_locs[memloc];
            let mut resized = AbstractMemLoc::new(existing.kind, size_bytes as usize);
            if existing.volatile {
                resized = resized.volatile();
            }
            func.mem_locs[memloc] = resized;

            let data = func.dfg.inst_data(inst).clone();
            func.dfg.replace_inst(
                inst,
                InstructionData::new(
                    Opcode::Calloca,
                    smallvec![data.operands[0].clone(), Operand::Literal(Literal::from_u64(size_bytes)), data.operands[2].clone()],
                    data.results.clone(),
                ),
            );
            changed = true;
        }
    }
    changed
}

fn collect_calloca_sites(func: &crate::ir::Function) -> Vec<(Inst, Label, MemLocId)> {
    let mut out = Vec::new();
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            if data.opcode != Opcode::Calloca {
                continue;
            }
            let Some(callee) = data.operands[2].as_label() else { continue };
            let Some(index) = data.operands[0].as_literal() else { continue };
            let memloc = MemLocId::from_u32(index.0.to::<u32>());
            out.push((inst, callee.clone(), memloc));
        }
    }
    out
}
