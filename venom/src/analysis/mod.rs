//! Analyses and the cache that memoizes them.
//!
//! Each analysis (CFG, dominator tree, liveness, memory SSA, ...) is
//! materialized eagerly into a plain data structure rather than computed
//! lazily through an iterator or a query closure — once a pass asks for
//! liveness, the whole per-instruction live-set table exists and can be
//! indexed directly. [`AnalysisCache`] is what makes repeated requests for
//! the same analysis across a run of passes free, and what lets a pass that
//! edits the CFG declare that fact so everything derived from the CFG gets
//! recomputed the next time it's asked for, instead of every pass
//! recomputing everything from scratch.

pub mod callgraph;
pub mod cfg;
pub mod dominators;
pub mod liveness;
pub mod memssa;
pub mod var_definition;
pub mod vra;

use std::rc::Rc;

use crate::ir::Function;

pub use callgraph::CallGraph;
pub use cfg::ControlFlowGraph;
pub use dominators::DominatorTree;
pub use liveness::Liveness;
pub use memssa::MemorySsa;
pub use var_definition::VarDefinition;
pub use vra::ValueRangeAnalysis;

/// Which analyses exist, used only to describe invalidation edges; the
/// cache itself stores each analysis in its own typed slot rather than a
/// type-erased map; so this crate doesn't need a `TypeId`-keyed registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Cfg,
    DominatorTree,
    Liveness,
    MemorySsa,
    VarDefinition,
    ValueRangeAnalysis,
}

/// Per-function analysis cache. Passes that only read IR never invalidate
/// anything; passes that change the CFG call
/// [`AnalysisCache::invalidate_cfg`] and everything transitively dependent
/// (dominators, liveness, memory SSA) is dropped with it — the dependency
/// edges the spec's design notes describe as "analysis invalidation as a
/// small dependency graph" are exactly the handful of `.take()` calls below.
#[derive(Default)]
pub struct AnalysisCache {
    cfg: Option<Rc<ControlFlowGraph>>,
    domtree: Option<Rc<DominatorTree>>,
    liveness: Option<Rc<Liveness>>,
    memssa: Option<Rc<MemorySsa>>,
    var_definition: Option<Rc<VarDefinition>>,
    vra: Option<Rc<ValueRangeAnalysis>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        AnalysisCache::default()
    }

    pub fn cfg(&mut self, func: &Function) -> Rc<ControlFlowGraph> {
        if self.cfg.is_none() {
            self.cfg = Some(Rc::new(ControlFlowGraph::compute(func)));
        }
        self.cfg.clone().unwrap()
    }

    pub fn domtree(&mut self, func: &Function) -> Rc<DominatorTree> {
        if self.domtree.is_none() {
            let cfg = self.cfg(func);
            self.domtree = Some(Rc::new(DominatorTree::compute(func, &cfg)));
        }
        self.domtree.clone().unwrap()
    }

    pub fn liveness(&mut self, func: &Function) -> Rc<Liveness> {
        if self.liveness.is_none() {
            let cfg = self.cfg(func);
            self.liveness = Some(Rc::new(Liveness::compute(func, &cfg)));
        }
        self.liveness.clone().unwrap()
    }

    pub fn memssa(&mut self, func: &Function) -> Rc<MemorySsa> {
        if self.memssa.is_none() {
            let cfg = self.cfg(func);
            self.memssa = Some(Rc::new(MemorySsa::compute(func, &cfg)));
        }
        self.memssa.clone().unwrap()
    }

    pub fn var_definition(&mut self, func: &Function) -> Rc<VarDefinition> {
        if self.var_definition.is_none() {
            self.var_definition = Some(Rc::new(VarDefinition::compute(func)));
        }
        self.var_definition.clone().unwrap()
    }

    pub fn vra(&mut self, func: &Function) -> Rc<ValueRangeAnalysis> {
        if self.vra.is_none() {
            let cfg = self.cfg(func);
            let domtree = self.domtree(func);
            self.vra = Some(Rc::new(ValueRangeAnalysis::compute(func, &cfg, &domtree)));
        }
        self.vra.clone().unwrap()
    }

    /// A pass that changed branching, added/removed blocks, or otherwise
    /// altered control flow calls this; every analysis derived from the CFG
    /// is dropped and recomputed on next demand.
    pub fn invalidate_cfg(&mut self) {
        self.cfg = None;
        self.domtree = None;
        self.liveness = None;
        self.memssa = None;
        self.vra = None;
    }

    /// A pass that only changed instruction operands/results without
    /// touching control flow or memory effects (e.g. algebraic
    /// simplification) calls this instead of the heavier
    /// [`AnalysisCache::invalidate_cfg`].
    pub fn invalidate_def_use(&mut self) {
        self.var_definition = None;
        self.vra = None;
    }

    pub fn invalidate_memory(&mut self) {
        self.memssa = None;
    }

    /// Force a fresh recomputation on the next request regardless of
    /// whether anything was invalidated, matching
    /// `IRAnalysesCache.force_analysis` in the source system: used by the
    /// call-graph analysis, which must be recomputed after the inliner
    /// changes which functions call which.
    pub fn invalidate_all(&mut self) {
        *self = AnalysisCache::default();
    }
}
