//! Memory SSA: per-address-space versioning of the effects taxonomy in
//! [`crate::ir::effects`], giving every load and store instruction the
//! identity of the most recent store (if any, and if known) that could
//! still be live at that point.
//!
//! Versions only propagate within a block's straight-line code and across a
//! block boundary when it has exactly one predecessor; any block reachable
//! from more than one predecessor is treated as "unknown reaching store"
//! (a barrier), which is sound (nothing is ever eliminated incorrectly) even
//! though it gives up some precision a full per-address alias analysis
//! would keep. `LoadElimination`, `RedundantLoadElimination`, `MemMergePass`
//! and `DeadStoreElimination` all consume this rather than re-deriving
//! reaching stores themselves.

use crate::analysis::cfg::ControlFlowGraph;
use crate::entity::SecondaryMap;
use crate::ir::{effects::EffectSet, Block, Function, Inst};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddrSpace {
    Memory,
    Storage,
    Transient,
}

pub fn addr_space_of(effects: &EffectSet) -> Option<AddrSpace> {
    if effects.writes_storage() {
        Some(AddrSpace::Storage)
    } else if effects.writes_transient() {
        Some(AddrSpace::Transient)
    } else if effects.writes_memory() {
        Some(AddrSpace::Memory)
    } else {
        None
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct ReachingStores {
    memory: Option<Inst>,
    storage: Option<Inst>,
    transient: Option<Inst>,
}

impl ReachingStores {
    fn get(&self, space: AddrSpace) -> Option<Inst> {
        match space {
            AddrSpace::Memory => self.memory,
            AddrSpace::Storage => self.storage,
            AddrSpace::Transient => self.transient,
        }
    }

    fn set(&mut self, space: AddrSpace, inst: Option<Inst>) {
        match space {
            AddrSpace::Memory => self.memory = inst,
            AddrSpace::Storage => self.storage = inst,
            AddrSpace::Transient => self.transient = inst,
        }
    }

    fn barrier_all(&mut self) {
        self.memory = None;
        self.storage = None;
        self.transient = None;
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemorySsa {
    /// The reaching store as of just before each instruction executes.
    reaching_before: SecondaryMap<Inst, ReachingStores>,
}

impl MemorySsa {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut memssa = MemorySsa::default();
        for block in func.blocks() {
            let mut state = if cfg.pred_count(block) == 1 {
                // Best-effort: inherit from the single predecessor's
                // end-of-block state by replaying it; cheap because blocks
                // are small and this only happens once per block.
                let pred = cfg.pred_iter(block).next().unwrap().block;
                memssa.end_of_block_state(func, pred)
            } else {
                ReachingStores::default()
            };

            for inst in func.layout.block_insts(block) {
                *memssa.reaching_before.get_mut(inst) = state;
                let data = func.dfg.inst_data(inst);
                let effects = crate::ir::opcode_effects(data.opcode);
                if effects.writes_any() {
                    if let Some(space) = addr_space_of(&effects) {
                        state.set(space, Some(inst));
                    } else {
                        // a call or other unclassified write: conservatively
                        // invalidate everything it might touch.
                        state.barrier_all();
                    }
                }
            }
        }
        memssa
    }

    fn end_of_block_state(&self, func: &Function, block: Block) -> ReachingStores {
        let mut state = *func
            .layout
            .block_insts(block)
            .last()
            .map(|i| self.reaching_before.get(i))
            .unwrap_or(&ReachingStores::default());
        if let Some(last) = func.layout.block_insts(block).last() {
            let data = func.dfg.inst_data(last);
            let effects = crate::ir::opcode_effects(data.opcode);
            if effects.writes_any() {
                match addr_space_of(&effects) {
                    Some(space) => state.set(space, Some(last)),
                    None => state.barrier_all(),
                }
            }
        }
        state
    }

    /// The most recent store to `space` reaching `inst`, if statically
    /// known. `None` means either there is no prior store, or the analysis
    /// lost precision (a merge point) and the true answer is unknown — both
    /// cases must be treated as "don't eliminate".
    pub fn reaching_store(&self, inst: Inst, space: AddrSpace) -> Option<Inst> {
        self.reaching_before.get(inst).get(space)
    }
}
