//! The library of function-local rewrites. Each pass is a plain function
//! taking the function's [`AnalysisCache`] and its [`Function`], following
//! exactly one request/invalidate contract with the cache: read whatever
//! analyses it needs (triggering on-demand computation), mutate the
//! function, and declare what it invalidated. [`pipeline::run_function_passes`]
//! is what sequences these in the fixed order the system depends on; no
//! pass here calls another.

pub mod algebraic;
pub mod assert_combiner;
pub mod assert_elimination;
pub mod assign_elimination;
pub mod branch_optimization;
pub mod cfg_normalization;
pub mod concretize_memloc;
pub mod cse;
pub mod dead_store_elimination;
pub mod dft;
pub mod fix_calloca;
pub mod float_allocas;
pub mod licm;
pub mod load_elimination;
pub mod lower_dload;
pub mod make_ssa;
pub mod mem2var;
pub mod mem_merge;
pub mod memory_copy_elision;
pub mod phi_elimination;
pub mod reduce_literals_codesize;
pub mod redundant_load_elimination;
pub mod remove_unused_variables;
pub mod revert_to_assert;
pub mod sccp;
pub mod simplify_cfg;
pub mod single_use_expansion;

/// Logs entry/exit of a pass at `trace` level, the same granularity
/// `cranelift_codegen::Context::compile`'s per-pass wrapper methods use.
/// Most passes are simple enough that a `log::trace!` at the call site in
/// [`crate::pipeline::run_function_passes`] says as much; this is for a pass
/// worth tracing on its own, independent of where it's called from (see
/// [`crate::passes::reduce_literals_codesize`], which only runs
/// conditionally and whose entry/exit is otherwise easy to lose track of).
macro_rules! trace_pass {
    ($name:literal, $func_name:expr, $body:block) => {{
        log::trace!("running pass {} on {}", $name, $func_name);
        let result = $body;
        log::trace!("finished pass {} on {}", $name, $func_name);
        result
    }};
}

pub(crate) use trace_pass;
