//! Orchestration: the fixed pass order a compilation actually runs, both the
//! per-function fixed-point loop and the whole-[`Context`] sequence around
//! it (global passes, call-graph-ordered per-function scheduling, the
//! two-pass deploy-memory sizing rebuild).
//!
//! Nothing here contains pass logic of its own; it only sequences calls into
//! [`crate::passes`], [`crate::inline`], and [`crate::checker`] in the order
//! the pipeline depends on, mirroring the source system's own top-level
//! driver function for function-at-a-time scheduling.

use crate::analysis::{AnalysisCache, CallGraph};
use crate::checker;
use crate::inline;
use crate::ir::{Context, FuncId, Function};
use crate::memalloc::{self, MemAllocator};
use crate::passes::*;
use crate::result::ErrorGroup;
use crate::settings::{OptimizeLevel, Settings};

/// Run every function-local pass once, in the fixed order the pipeline
/// depends on. Corresponds to `_run_passes` in the source driver:
/// `SimplifyCFG`/`MakeSSA` first establish the SSA shape the rest of the
/// passes assume, `PhiElimination` is threaded through wherever a pass that
/// doesn't understand block-merge phis runs next, and everything after
/// `ConcretizeMemLoc` is pure instruction-level cleanup. The sequence itself
/// is the fixed point: passes appear more than once where the source driver
/// found that one run alone didn't expose enough to the next pass.
///
/// A handful of passes sit beside a pass they complement rather than in a
/// slot of their own: `RedundantLoadElimination` right after
/// `LoadElimination` since both forward loads/stores within a block,
/// `AssertCombiner`/`AssertElimination` bracketing `RevertToAssert` since
/// combining and eliminating asserts only pays off once `RevertToAssert` has
/// turned raw reverts into asserts to work with, `LoopInvariantCodeMotion`
/// once cleanup has settled but before memory locations go concrete (hoisting
/// reasons about `alloca` addresses, which `ConcretizeMemLoc` then turns into
/// literal offsets), and `MemoryCopyElision` right after `MemMerge` since both
/// rewrite memory-to-memory copies.
pub fn run_function_passes(ac: &mut AnalysisCache, func: &mut Function, allocator: &mut MemAllocator, settings: &Settings) {
    float_allocas::run(ac, func);
    simplify_cfg::run(ac, func);
    make_ssa::run(ac, func);
    phi_elimination::run(ac, func);
    algebraic::run(ac, func);
    sccp::run(ac, func);
    simplify_cfg::run(ac, func);
    assign_elimination::run(ac, func);
    mem2var::run(ac, func);
    make_ssa::run(ac, func);
    phi_elimination::run(ac, func);
    sccp::run(ac, func);
    simplify_cfg::run(ac, func);
    assign_elimination::run(ac, func);
    algebraic::run(ac, func);
    load_elimination::run(ac, func);
    redundant_load_elimination::run(ac, func);
    phi_elimination::run(ac, func);
    assign_elimination::run(ac, func);
    sccp::run(ac, func);
    assign_elimination::run(ac, func);
    assert_combiner::run(ac, func);
    revert_to_assert::run(ac, func);
    assert_elimination::run(ac, func);
    simplify_cfg::run(ac, func);
    remove_unused_variables::run(ac, func);
    dead_store_elimination::run(ac, func);
    assign_elimination::run(ac, func);
    remove_unused_variables::run(ac, func);
    licm::run(ac, func);
    concretize_memloc::run(allocator, func);
    sccp::run(ac, func);
    simplify_cfg::run(ac, func);
    mem_merge::run(ac, func);
    memory_copy_elision::run(ac, func);
    lower_dload::run(ac, func);
    remove_unused_variables::run(ac, func);
    branch_optimization::run(ac, func);
    algebraic::run(ac, func);
    remove_unused_variables::run(ac, func);
    phi_elimination::run(ac, func);
    assign_elimination::run(ac, func);
    cse::run(ac, func);
    assign_elimination::run(ac, func);
    remove_unused_variables::run(ac, func);
    single_use_expansion::run(ac, func);
    if settings.optimize.is_codesize() {
        reduce_literals_codesize::run(ac, func);
    }
    dft::run(ac, func);
    cfg_normalization::run(ac, func);
}

/// Run the two global, whole-[`Context`] passes that have to see every
/// function before any per-function pass can run: every `calloca` needs a
/// resolved callee before it carries a final size, and the inliner needs
/// every callee's body to still exist (pre-trimming) to copy from.
fn run_global_passes(ctx: &mut Context, settings: &Settings) {
    fix_calloca::run(ctx);
    inline::run(ctx, settings);
}

/// Schedule the per-function pipeline across every function reachable from
/// `entry`, bottom-up over the call graph (callees finish before their
/// callers are touched, mirroring `_run_fn_passes_r`), skipping any function
/// already visited through another call path.
fn run_fn_passes(ctx: &mut Context, entry: FuncId, settings: &Settings, allocator: &mut MemAllocator) {
    let call_graph = CallGraph::compute(ctx);
    let order = call_graph.bottom_up_order(entry);
    for fid in order {
        let mut ac = AnalysisCache::new();
        let func = ctx.function_mut(fid);
        run_function_passes(&mut ac, func, allocator, settings);
    }
}

/// Run the full pipeline over every function in `ctx`, starting from its
/// entry function: the calling-convention pre-check, the global passes, the
/// call-graph-ordered per-function passes, then a final structural
/// re-validation. `allocator` is threaded through explicitly rather than
/// read from `ctx.mem_allocator` directly so the deploy-memory sizing
/// rebuild in [`run_with_deploy_sizing`] can swap it out between the two
/// builds.
pub fn run_passes_on(ctx: &mut Context, settings: &Settings, allocator: &mut MemAllocator) -> Result<(), ErrorGroup> {
    checker::check_venom(ctx)?;

    run_global_passes(ctx, settings);

    let Some(entry) = ctx.entry_function() else {
        return Err(single_error(crate::result::VenomError::NoEntryBlock));
    };
    run_fn_passes(ctx, entry, settings, allocator);

    checker::check_venom(ctx)
}

fn single_error(e: crate::result::VenomError) -> ErrorGroup {
    let mut errors = ErrorGroup::new();
    errors.push(e);
    errors
}

/// The top-level entry point for a deploy (constructor + runtime) unit: runs
/// the whole pipeline twice, using [`memalloc::build_with_deploy_sizing`] to
/// discover the constructor's true peak scratch usage on the first build and
/// feed it back in as the second build's starting watermark, so the deploy
/// region the constructor embeds ends up sized for what the constructor
/// itself actually needs rather than a guess.
///
/// `build_ctx` is handed the starting watermark for the allocator (`None`
/// the first time, `Some(peak)` the second) and is expected to construct a
/// fresh [`Context`] from the frontend's IR, already carrying
/// `free_var1`/`free_var2`/`deploy_mem` wired up.
pub fn generate_venom(
    mut build_ctx: impl FnMut(Option<usize>) -> Context,
    settings: &Settings,
) -> Result<Context, ErrorGroup> {
    memalloc::build_with_deploy_sizing(|starting_eom| {
        let mut ctx = build_ctx(starting_eom);
        let mut allocator = match starting_eom {
            Some(eom) => MemAllocator::starting_at(eom),
            None => MemAllocator::new(),
        };
        let skip = memalloc::default_skip_list(ctx.free_var1, ctx.free_var2, ctx.deploy_mem);
        let outcome = run_passes_on(&mut ctx, settings, &mut allocator).map(|()| ctx);
        (outcome, allocator, skip)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, InstructionData, Label, Opcode};
    use smallvec::smallvec;

    #[test]
    fn empty_function_survives_the_full_pipeline() {
        let mut func = Function::new(Label::new("f"));
        func.is_entry = true;
        let entry = func.dfg.make_block();
        func.layout.append_block(entry);
        func.dfg.set_block_label(entry, Label::new("entry"));
        let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop, entry);

        let mut ctx = Context::new();
        let fid = ctx.add_function(func);
        ctx.set_entry_function(fid);

        let settings = Settings::new(OptimizeLevel::Gas);
        let mut allocator = MemAllocator::new();
        assert!(run_passes_on(&mut ctx, &settings, &mut allocator).is_ok());
    }
}
