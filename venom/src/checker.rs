//! The post-pipeline (and pre-pipeline calling-convention) semantic checker.
//!
//! Every structural invariant the rest of the crate assumes without
//! re-checking it — every block is terminated, every variable used has a
//! reaching definition — is validated here rather than at each call site,
//! matching the error taxonomy in [`crate::result`]: a violation found here
//! means a pass produced malformed IR, a programmer error worth reporting
//! precisely rather than discovering as a panic three passes later.

use rustc_hash::FxHashSet;

use crate::analysis::AnalysisCache;
use crate::ir::{Arity, Context, Function, Opcode, Var};
use crate::result::{ErrorGroup, VenomError};

/// Run the full structural + reaching-definition check over every function
/// in `ctx`. Errors from different functions are all collected before
/// returning, matching the source system's "report everything in one pass"
/// policy for diagnostics the user is expected to act on (as opposed to an
/// internal invariant violation, which panics immediately instead).
pub fn check_venom(ctx: &Context) -> Result<(), ErrorGroup> {
    let mut errors = ErrorGroup::new();
    for (_, func) in ctx.functions() {
        errors.extend(check_function(func));
    }
    errors.extend(check_calling_convention(ctx));
    errors.into_result()
}

/// Checks every `invoke` site against the callee it names, before any pass
/// has a chance to inline or otherwise rewrite the call: the argument count
/// must match the callee's declared parameter count, and every `ret` the
/// callee can reach must hand back exactly as many values as the `invoke`
/// expects to receive. A frontend bug here would otherwise surface much
/// later as a scheduler stack-depth error with no trace back to the actual
/// mismatched call site.
pub fn check_calling_convention(ctx: &Context) -> ErrorGroup {
    let mut errors = ErrorGroup::new();
    for (_, func) in ctx.functions() {
        for block in func.blocks() {
            for inst in func.layout.block_insts(block) {
                let data = func.dfg.inst_data(inst);
                if data.opcode != Opcode::Invoke {
                    continue;
                }
                let Some(label) = data.operands.first().and_then(|o| o.as_label()) else {
                    continue;
                };
                let Some(callee_id) = ctx.function_by_name(label) else {
                    continue;
                };
                let callee = ctx.function(callee_id);

                let arg_count = data.operands.len() - 1;
                if arg_count != callee.params.len() {
                    errors.push(VenomError::ArityMismatch { inst, expected: callee.params.len(), found: arg_count });
                }

                for callee_block in callee.blocks() {
                    for callee_inst in callee.layout.block_insts(callee_block) {
                        let ret_data = callee.dfg.inst_data(callee_inst);
                        if ret_data.opcode != Opcode::Ret {
                            continue;
                        }
                        if ret_data.operands.len() != data.results.len() {
                            errors.push(VenomError::ArityMismatch {
                                inst,
                                expected: data.results.len(),
                                found: ret_data.operands.len(),
                            });
                        }
                    }
                }
            }
        }
    }
    errors
}

/// Checks every instruction's operand count against [`Opcode::arity`]. Phi's
/// `Variable` arity still has a fixed shape (alternating `(Label, Var)`
/// pairs), so it gets its own even-count check rather than being treated as
/// unconstrained; `invoke`/`call`-family ops only require a callee operand
/// to be present at all, since their true arity is a property of the callee
/// ([`check_calling_convention`] is what validates that).
fn check_instruction_arity(func: &Function, errors: &mut ErrorGroup) {
    for block in func.blocks() {
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            match data.opcode.arity() {
                Arity::Fixed(expected) if data.operands.len() != expected => {
                    errors.push(VenomError::ArityMismatch { inst, expected, found: data.operands.len() });
                }
                Arity::Fixed(_) => {}
                Arity::Variable if data.opcode == Opcode::Phi && data.operands.len() % 2 != 0 => {
                    errors.push(VenomError::ArityMismatch {
                        inst,
                        expected: data.operands.len() + 1,
                        found: data.operands.len(),
                    });
                }
                Arity::Variable
                    if data.opcode.is_call() && data.operands.is_empty() =>
                {
                    errors.push(VenomError::ArityMismatch { inst, expected: 1, found: 0 });
                }
                Arity::Variable => {}
            }
        }
    }
}

pub fn check_function(func: &Function) -> ErrorGroup {
    let mut errors = ErrorGroup::new();

    for block in func.blocks() {
        let terminated = func
            .layout
            .last_inst(block)
            .is_some_and(|inst| func.dfg.inst_data(inst).opcode.is_terminator());
        if !terminated {
            errors.push(VenomError::BasicBlockNotTerminated(block));
        }
    }
    if !errors.is_empty() {
        // A block with no terminator has no well-defined successors, so CFG
        // and dominance are meaningless until this is fixed first.
        return errors;
    }

    check_instruction_arity(func, &mut errors);
    if !errors.is_empty() {
        return errors;
    }

    let mut ac = AnalysisCache::new();
    let domtree = ac.domtree(func);
    let var_def = ac.var_definition(func);

    for block in func.blocks() {
        let mut defined_in_block: FxHashSet<Var> = func.dfg.block_params(block).iter().copied().collect();

        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);

            if data.opcode == Opcode::Phi {
                for (label, value) in data.phi_args() {
                    let Some(pred_block) = func.block_by_label(label) else { continue };
                    let reaches = var_def
                        .def_blocks(value)
                        .iter()
                        .any(|&d| d == pred_block || domtree.dominates(d, pred_block));
                    if !reaches {
                        errors.push(VenomError::VarNotDefined(value, pred_block));
                    }
                }
                for &r in &data.results {
                    defined_in_block.insert(r);
                }
                continue;
            }

            for operand in &data.operands {
                let Some(v) = operand.as_var() else { continue };
                if defined_in_block.contains(&v) {
                    continue;
                }
                let reaches_from_dominator =
                    var_def.def_blocks(v).iter().any(|&d| d != block && domtree.dominates(d, block));
                if !reaches_from_dominator {
                    errors.push(VenomError::VarNotDefined(v, block));
                }
            }
            for &r in &data.results {
                defined_in_block.insert(r);
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Operand};
    use smallvec::smallvec;

    #[test]
    fn rejects_an_add_with_the_wrong_operand_count() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let v = func.dfg.make_var();
        let add = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Literal(Literal::one())],
            smallvec![v],
        ));
        func.layout.append_inst(add, b0);
        let term = func.dfg.make_inst(InstructionData::new(
            Opcode::Return,
            smallvec![Operand::Var(v), Operand::Literal(Literal::zero())],
            Default::default(),
        ));
        func.layout.append_inst(term, b0);

        let errors = check_function(&func);
        assert!(matches!(errors.errors(), [VenomError::ArityMismatch { expected: 2, found: 1, .. }]));
    }

    #[test]
    fn invoke_argument_count_must_match_callee_params() {
        let mut ctx = Context::new();

        let mut callee = Function::new("callee");
        let cb = callee.dfg.make_block();
        callee.dfg.set_block_label(cb, Label::new("entry"));
        callee.layout.append_block(cb);
        let p = callee.dfg.append_block_param(cb);
        callee.params.push(p);
        let ret = callee.dfg.make_inst(InstructionData::new(Opcode::Ret, smallvec![Operand::Var(p)], Default::default()));
        callee.layout.append_inst(ret, cb);
        ctx.add_function(callee);

        let mut caller = Function::new("caller");
        caller.is_entry = true;
        let eb = caller.dfg.make_block();
        caller.dfg.set_block_label(eb, Label::new("entry"));
        caller.layout.append_block(eb);
        let result = caller.dfg.make_var();
        let invoke = caller.dfg.make_inst(InstructionData::new(
            Opcode::Invoke,
            smallvec![Operand::Label(Label::new("callee"))],
            smallvec![result],
        ));
        caller.layout.append_inst(invoke, eb);
        let stop = caller.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        caller.layout.append_inst(stop, eb);
        let caller_id = ctx.add_function(caller);
        ctx.set_entry_function(caller_id);

        let errors = check_calling_convention(&ctx);
        assert!(matches!(errors.errors(), [VenomError::ArityMismatch { expected: 1, found: 0, .. }]));
    }
}
