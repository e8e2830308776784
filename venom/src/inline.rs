//! Function inlining: replaces an `invoke` call site with a spliced-in copy
//! of the callee's body.
//!
//! Shaped after `cranelift_codegen::inline`'s mechanics — clone the callee's
//! entities into the caller under a fresh offset/label scheme, split the
//! call-site block, replace the call with a jump into the inlined entry, and
//! rewrite every `ret` in the callee into a jump back to a continuation —
//! but scaled down to what a venom [`Function`] actually owns: only
//! [`Block`]s, [`Var`]s, and (pre-`ConcretizeMemLocPass`) abstract memory
//! locations need remapping, none of Cranelift's signatures, stack maps, or
//! exception tables.
//!
//! Runs globally, once per call-graph fixed point, before any per-function
//! pass: [`crate::analysis::CallGraph::bottom_up_order`] guarantees a callee
//! is already a final candidate for inlining (no further shrinking from
//! passes not yet run) by the time its caller is considered, matching the
//! source system's "inline in reverse postorder" rule.

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::analysis::CallGraph;
use crate::ir::{
    Block, Context, FuncId, Function, Inst, InstructionData, Label, Literal, MemLocId, Opcode, Operand,
    OperandList, ResultList, Var,
};
use crate::settings::{OptimizeLevel, Settings};

/// Inline call sites to a fixed point, processing the call graph bottom-up
/// each round. Returns whether anything changed.
pub fn run(ctx: &mut Context, settings: &Settings) -> bool {
    if settings.optimize.is_none() {
        return false;
    }
    let Some(entry) = ctx.entry_function() else { return false };

    let mut changed = false;
    loop {
        let call_graph = CallGraph::compute(ctx);
        let order = call_graph.bottom_up_order(entry);
        let mut inlined_this_round = false;
        for fid in order {
            while let Some((inst, callee_id)) = next_inlinable_call(ctx, fid, &call_graph, settings) {
                inline_call(ctx, fid, inst, callee_id);
                inlined_this_round = true;
                changed = true;
            }
        }
        if !inlined_this_round {
            break;
        }
    }
    changed
}

fn next_inlinable_call(
    ctx: &Context,
    caller_id: FuncId,
    call_graph: &CallGraph,
    settings: &Settings,
) -> Option<(Inst, FuncId)> {
    let caller = ctx.function(caller_id);
    for block in caller.blocks() {
        for inst in caller.layout.block_insts(block) {
            let data = caller.dfg.inst_data(inst);
            if data.opcode != Opcode::Invoke {
                continue;
            }
            let Some(label) = data.operands.first().and_then(|o| o.as_label()) else { continue };
            let Some(callee_id) = ctx.function_by_name(label) else { continue };
            if callee_id == caller_id {
                continue;
            }
            if should_inline(ctx, callee_id, call_graph, settings) {
                return Some((inst, callee_id));
            }
        }
    }
    None
}

fn should_inline(ctx: &Context, callee_id: FuncId, call_graph: &CallGraph, settings: &Settings) -> bool {
    let callee = ctx.function(callee_id);
    let size: usize = callee.blocks().map(|b| callee.layout.block_insts(b).count()).sum();
    match settings.optimize {
        OptimizeLevel::None => false,
        OptimizeLevel::Codesize => size <= settings.inliner_size_threshold * 4,
        OptimizeLevel::Gas => call_graph.get_callees(callee_id).is_empty() && size <= settings.inliner_size_threshold,
    }
}

/// Splice a copy of `callee_id`'s body in place of the `invoke` at `call_inst`
/// in `caller_id`.
fn inline_call(ctx: &mut Context, caller_id: FuncId, call_inst: Inst, callee_id: FuncId) {
    let callee = ctx.function(callee_id).clone();
    let caller = ctx.function_mut(caller_id);

    let call_block = caller.layout.inst_block(call_inst).expect("invoke must be in the layout");
    let call_data = caller.dfg.inst_data(call_inst).clone();
    let call_args: Vec<Var> = call_data.operands[1..].iter().filter_map(|o| o.as_var()).collect();
    let call_results: Vec<Var> = call_data.results.to_vec();
    let suffix = call_inst.as_u32() as u64;

    let continuation = split_block_after(caller, call_block, call_inst);

    // Pre-create one phi per return value at the continuation; every `ret`
    // site found below pushes its incoming edge into these.
    let result_phis: Vec<Inst> = call_results
        .iter()
        .map(|&result| {
            let phi = caller.dfg.make_inst(InstructionData::new(Opcode::Phi, OperandList::new(), smallvec![result]));
            let anchor = caller.layout.block_insts(continuation).next();
            match anchor {
                Some(first) => caller.layout.insert_inst_before(phi, first),
                None => caller.layout.append_inst(phi, continuation),
            }
            phi
        })
        .collect();

    // Clone callee blocks with collision-free labels, splicing them into the
    // caller's layout right after the call-site block, in callee order.
    let mut block_map: FxHashMap<Block, Block> = FxHashMap::default();
    let mut label_map: FxHashMap<Label, Label> = FxHashMap::default();
    let mut prev = call_block;
    for callee_block in callee.blocks() {
        let inlined = caller.dfg.make_block();
        caller.layout.insert_block_after(inlined, prev);
        prev = inlined;
        let base_label = callee
            .dfg
            .block_label(callee_block)
            .cloned()
            .expect("every block must carry a label by the time the inliner runs");
        let new_label = base_label.uniquified(suffix);
        caller.dfg.set_block_label(inlined, new_label.clone());
        label_map.insert(base_label, new_label);
        block_map.insert(callee_block, inlined);
    }

    // Bind callee parameters directly to the call's arguments; every other
    // var (instruction results, non-entry block params) gets a fresh name.
    let mut var_map: FxHashMap<Var, Var> = FxHashMap::default();
    let callee_entry = callee.entry_block().expect("callee must have an entry block");
    for (&param, &arg) in callee.params.iter().zip(call_args.iter()) {
        var_map.insert(param, arg);
    }
    for callee_block in callee.blocks() {
        if callee_block == callee_entry {
            continue;
        }
        let inlined_block = block_map[&callee_block];
        for &p in callee.dfg.block_params(callee_block) {
            let fresh = caller.dfg.append_block_param(inlined_block);
            var_map.insert(p, fresh);
        }
    }
    for callee_block in callee.blocks() {
        for inst in callee.layout.block_insts(callee_block) {
            for &r in &callee.dfg.inst_data(inst).results {
                var_map.entry(r).or_insert_with(|| caller.dfg.make_var());
            }
        }
    }

    // Remap abstract memory locations the callee hasn't yet concretized
    // (`alloca`/`palloca`/`calloca` run before `ConcretizeMemLocPass`, which
    // is per-function and therefore hasn't touched the callee's copy).
    let mut memloc_map: FxHashMap<MemLocId, MemLocId> = FxHashMap::default();
    for (old_id, loc) in callee.mem_locs.iter() {
        memloc_map.insert(old_id, caller.mem_locs.push(*loc));
    }

    for callee_block in callee.blocks() {
        let inlined_block = block_map[&callee_block];
        for inst in callee.layout.block_insts(callee_block) {
            let data = callee.dfg.inst_data(inst);

            if data.opcode == Opcode::Ret {
                for (&phi, ret_operand) in result_phis.iter().zip(data.operands.iter()) {
                    let incoming = translate_operand(ret_operand, &var_map, &label_map);
                    let incoming_var = match incoming {
                        Operand::Var(v) => v,
                        // A `ret` of a bare literal: give it a name so the
                        // phi's incoming-value convention (always a `Var`)
                        // still holds.
                        other => {
                            let v = caller.dfg.make_var();
                            let assign =
                                caller.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![other], smallvec![v]));
                            caller.layout.append_inst(assign, inlined_block);
                            v
                        }
                    };
                    let inlined_label = caller.dfg.block_label(inlined_block).cloned().unwrap();
                    caller.dfg.inst_data_mut(phi).push_phi_arg(inlined_label, incoming_var);
                }
                let continuation_label = caller.dfg.block_label(continuation).cloned().unwrap();
                let jmp = caller.dfg.make_inst(InstructionData::new(
                    Opcode::Jmp,
                    smallvec![Operand::Label(continuation_label)],
                    ResultList::new(),
                ));
                caller.layout.append_inst(jmp, inlined_block);
                continue;
            }

            let mut operands: OperandList =
                data.operands.iter().map(|op| translate_operand(op, &var_map, &label_map)).collect();
            if matches!(data.opcode, Opcode::Alloca | Opcode::Palloca | Opcode::Calloca) {
                if let Some(old_id) = data.operands[0].as_literal().map(|l| MemLocId::from_u32(l.0.to::<u32>())) {
                    if let Some(&new_id) = memloc_map.get(&old_id) {
                        operands[0] = Operand::Literal(Literal::from_u64(new_id.as_u32() as u64));
                    }
                }
            }
            let results: ResultList = data.results.iter().map(|r| var_map[r]).collect();

            let new_inst = caller.dfg.make_inst(InstructionData::new(data.opcode, operands, results));
            caller.layout.append_inst(new_inst, inlined_block);
        }
    }

    let inlined_entry_label = caller.dfg.block_label(block_map[&callee_entry]).cloned().unwrap();
    caller.dfg.replace_inst(
        call_inst,
        InstructionData::new(Opcode::Jmp, smallvec![Operand::Label(inlined_entry_label)], ResultList::new()),
    );
}

fn translate_operand(op: &Operand, var_map: &FxHashMap<Var, Var>, label_map: &FxHashMap<Label, Label>) -> Operand {
    match op {
        Operand::Var(v) => Operand::Var(var_map.get(v).copied().unwrap_or(*v)),
        Operand::Label(l) => Operand::Label(label_map.get(l).cloned().unwrap_or_else(|| l.clone())),
        other => other.clone(),
    }
}

/// Detach every instruction after `inst` (exclusive) in `block` into a fresh
/// successor block, leaving `inst` as `block`'s new terminator-to-be.
fn split_block_after(caller: &mut Function, block: Block, inst: Inst) -> Block {
    let continuation = caller.dfg.make_block();
    caller.layout.insert_block_after(continuation, block);
    caller.dfg.set_block_label(continuation, Label::new(format!("{}.cont{}", caller.name, inst.as_u32())));

    let mut next = caller.layout.next_inst(inst);
    while let Some(i) = next {
        next = caller.layout.next_inst(i);
        caller.layout.remove_inst(i);
        caller.layout.append_inst(i, continuation);
    }
    continuation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlines_single_block_callee_and_threads_return_value() {
        let mut ctx = Context::new();

        let mut callee = Function::new(Label::new("double"));
        let cb = callee.dfg.make_block();
        callee.layout.append_block(cb);
        callee.dfg.set_block_label(cb, Label::new("entry"));
        let p = callee.dfg.append_block_param(cb);
        callee.params.push(p);
        let two = callee.dfg.make_var();
        let lit_inst = callee.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(2))],
            smallvec![two],
        ));
        callee.layout.append_inst(lit_inst, cb);
        let doubled = callee.dfg.make_var();
        let mul = callee.dfg.make_inst(InstructionData::new(
            Opcode::Mul,
            smallvec![Operand::Var(p), Operand::Var(two)],
            smallvec![doubled],
        ));
        callee.layout.append_inst(mul, cb);
        let ret = callee.dfg.make_inst(InstructionData::new(Opcode::Ret, smallvec![Operand::Var(doubled)], Default::default()));
        callee.layout.append_inst(ret, cb);
        let callee_id = ctx.add_function(callee);

        let mut caller = Function::new(Label::new("main"));
        caller.is_entry = true;
        let mb = caller.dfg.make_block();
        caller.layout.append_block(mb);
        caller.dfg.set_block_label(mb, Label::new("entry"));
        let arg = caller.dfg.make_var();
        let arg_inst = caller.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(21))],
            smallvec![arg],
        ));
        caller.layout.append_inst(arg_inst, mb);
        let result = caller.dfg.make_var();
        let invoke = caller.dfg.make_inst(InstructionData::new(
            Opcode::Invoke,
            smallvec![Operand::Label(Label::new("double")), Operand::Var(arg)],
            smallvec![result],
        ));
        caller.layout.append_inst(invoke, mb);
        let stop = caller.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        caller.layout.append_inst(stop, mb);
        let caller_id = ctx.add_function(caller);
        ctx.set_entry_function(caller_id);

        let settings = Settings::new(OptimizeLevel::Codesize);
        assert!(run(&mut ctx, &settings));

        let main = ctx.function(caller_id);
        assert!(main.blocks().count() >= 3, "expected the call block, an inlined body block, and a continuation");
        let has_invoke = main.blocks().flat_map(|b| main.layout.block_insts(b)).any(|i| main.dfg.opcode(i) == Opcode::Invoke);
        assert!(!has_invoke, "invoke should have been replaced by a jump");
    }
}
