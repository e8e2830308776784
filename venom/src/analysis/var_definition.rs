//! Where each variable is defined, and which variables have more than one
//! definition site.
//!
//! Before [`crate::passes::make_ssa`] runs, a named variable may be the
//! result of more than one instruction scattered across different blocks —
//! the frontend's equivalent of a mutable local reassigned along different
//! paths. This analysis is what `MakeSSA` consumes to know which variables
//! need phi placement at all (the single-definition ones are already in SSA
//! form and are left untouched), and what the post-pipeline semantic
//! checker uses to flag a real double-definition bug if one survives to the
//! end of the pipeline.

use rustc_hash::FxHashMap;

use crate::ir::{Block, Function, Var};

#[derive(Clone, Debug, Default)]
pub struct VarDefinition {
    def_sites: FxHashMap<Var, Vec<Block>>,
}

impl VarDefinition {
    pub fn compute(func: &Function) -> Self {
        let mut def_sites: FxHashMap<Var, Vec<Block>> = FxHashMap::default();
        for block in func.blocks() {
            for &param in func.dfg.block_params(block) {
                def_sites.entry(param).or_default().push(block);
            }
            for inst in func.layout.block_insts(block) {
                for &result in &func.dfg.inst_data(inst).results {
                    def_sites.entry(result).or_default().push(block);
                }
            }
        }
        VarDefinition { def_sites }
    }

    pub fn def_blocks(&self, var: Var) -> &[Block] {
        self.def_sites.get(&var).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_multiply_defined(&self, var: Var) -> bool {
        self.def_blocks(var).len() > 1
    }

    pub fn multiply_defined_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.def_sites.iter().filter(|(_, blocks)| blocks.len() > 1).map(|(&v, _)| v)
    }

    pub fn is_defined(&self, var: Var) -> bool {
        self.def_sites.contains_key(&var)
    }
}
