//! Liveness analysis: for each block, which variables are live coming in
//! and going out, plus a per-instruction "live after this point" view used
//! by the dead-store eliminator and the stack scheduler.
//!
//! Phi operands are attributed to the predecessor block they came from, not
//! the block the phi itself lives in — this is the one subtlety the stack
//! scheduler depends on for correctness (§ design notes): a value used only
//! as a phi input from block A must be live at the end of A even though the
//! phi's textual position is in a successor.

use rustc_hash::FxHashSet;

use crate::analysis::cfg::ControlFlowGraph;
use crate::entity::{EntityRef, SecondaryMap};
use crate::ir::{Block, Function, Inst, Var};

#[derive(Clone, Debug, Default)]
struct BlockLiveness {
    used: FxHashSet<Var>,
    defined: FxHashSet<Var>,
    live_in: FxHashSet<Var>,
    live_out: FxHashSet<Var>,
}

#[derive(Clone, Debug, Default)]
pub struct Liveness {
    blocks: SecondaryMap<Block, BlockLiveness>,
    /// Live-out set as of just after each instruction, used for
    /// "is this the last use" queries the stack scheduler and DSE need.
    live_after: SecondaryMap<Inst, Vec<Var>>,
}

impl Liveness {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut liveness = Liveness::default();

        for block in func.blocks() {
            let mut defined = FxHashSet::default();
            let mut used = FxHashSet::default();
            for &param in func.dfg.block_params(block) {
                defined.insert(param);
            }
            for inst in func.layout.block_insts(block) {
                let data = func.dfg.inst_data(inst);
                if data.opcode.is_phi() {
                    // phi uses are attributed to the predecessor, handled below.
                    for &r in &data.results {
                        defined.insert(r);
                    }
                    continue;
                }
                for v in data.var_operands() {
                    if !defined.contains(&v) {
                        used.insert(v);
                    }
                }
                for &r in &data.results {
                    defined.insert(r);
                }
            }
            liveness.blocks.get_mut(block).used = used;
            liveness.blocks.get_mut(block).defined = defined;
        }

        // phi-operand liveness, attributed to the predecessor block named by
        // each (label, value) pair.
        for block in func.blocks() {
            for inst in func.layout.block_insts(block) {
                let data = func.dfg.inst_data(inst);
                if !data.opcode.is_phi() {
                    continue;
                }
                for (label, value) in data.phi_args() {
                    if let Some(pred) = func.block_by_label(label) {
                        if !liveness.blocks.get(pred).defined.contains(&value) {
                            liveness.blocks.get_mut(pred).used.insert(value);
                        }
                    }
                }
            }
        }

        // live_in = used ∪ (live_out \ defined), fixed point over a
        // worklist seeded from postorder for fast convergence on
        // typically-forward-ish CFGs.
        let entry = func.entry_block();
        let order = entry.map(|e| cfg.postorder(e)).unwrap_or_default();
        let mut changed = true;
        while changed {
            changed = false;
            for &block in &order {
                let mut live_out = FxHashSet::default();
                for succ in cfg.succ_iter(block) {
                    live_out.extend(liveness.blocks.get(succ).live_in.iter().copied());
                }
                let data = liveness.blocks.get_mut(block);
                if data.live_out != live_out {
                    data.live_out = live_out.clone();
                    changed = true;
                }
                let mut live_in = data.used.clone();
                for v in &live_out {
                    if !data.defined.contains(v) {
                        live_in.insert(*v);
                    }
                }
                if data.live_in != live_in {
                    data.live_in = live_in;
                    changed = true;
                }
            }
        }

        liveness.compute_live_after(func);
        liveness
    }

    fn compute_live_after(&mut self, func: &Function) {
        for block in func.blocks() {
            let mut live = self.blocks.get(block).live_out.clone();
            let insts: Vec<Inst> = func.layout.block_insts(block).collect();
            for &inst in insts.iter().rev() {
                let data = func.dfg.inst_data(inst);
                for &r in &data.results {
                    live.remove(&r);
                }
                if !data.opcode.is_phi() {
                    for v in data.var_operands() {
                        live.insert(v);
                    }
                }
                let mut snapshot: Vec<Var> = live.iter().copied().collect();
                snapshot.sort_unstable_by_key(|v| v.index());
                *self.live_after.get_mut(inst) = snapshot;
            }
        }
    }

    pub fn live_in(&self, block: Block) -> impl Iterator<Item = Var> + '_ {
        self.blocks.get(block).live_in.iter().copied()
    }

    pub fn live_out(&self, block: Block) -> impl Iterator<Item = Var> + '_ {
        self.blocks.get(block).live_out.iter().copied()
    }

    pub fn is_live_out(&self, block: Block, var: Var) -> bool {
        self.blocks.get(block).live_out.contains(&var)
    }

    /// Variables live immediately after `inst` executes.
    pub fn live_after(&self, inst: Inst) -> &[Var] {
        self.live_after.get(inst)
    }

    pub fn is_live_after(&self, inst: Inst, var: Var) -> bool {
        self.live_after(inst).contains(&var)
    }
}
