//! Control-flow graph: predecessors and successors of every block, computed
//! once and shared by every analysis built on top of it.

use crate::entity::SecondaryMap;
use crate::ir::{Block, Function, Inst};

/// A predecessor edge: the predecessor block, and the specific terminator
/// instruction in it that branches to the block this edge points at. Phi
/// operand liveness is attributed to the predecessor, not the phi's own
/// block, which is why the edge needs to remember which instruction (and
/// therefore which specific successor slot, for a `jnz`) it came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockPredecessor {
    pub block: Block,
    pub inst: Inst,
}

impl BlockPredecessor {
    pub fn new(block: Block, inst: Inst) -> Self {
        BlockPredecessor { block, inst }
    }
}

#[derive(Clone, Debug, Default)]
struct CfgNode {
    predecessors: Vec<BlockPredecessor>,
    successors: Vec<Block>,
}

#[derive(Clone, Debug, Default)]
pub struct ControlFlowGraph {
    data: SecondaryMap<Block, CfgNode>,
}

impl ControlFlowGraph {
    pub fn compute(func: &Function) -> Self {
        let mut cfg = ControlFlowGraph::default();
        for block in func.blocks() {
            let Some(term) = func.layout.last_inst(block) else { continue };
            let data = func.dfg.inst_data(term);
            for target_label in data.branch_targets() {
                let Some(target) = func.block_by_label(target_label) else { continue };
                cfg.data.get_mut(block).successors.push(target);
                cfg.data
                    .get_mut(target)
                    .predecessors
                    .push(BlockPredecessor::new(block, term));
            }
        }
        cfg
    }

    pub fn pred_iter(&self, block: Block) -> impl Iterator<Item = BlockPredecessor> + '_ {
        self.data.get(block).predecessors.iter().copied()
    }

    pub fn succ_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data.get(block).successors.iter().copied()
    }

    pub fn pred_count(&self, block: Block) -> usize {
        self.data.get(block).predecessors.len()
    }

    pub fn succ_count(&self, block: Block) -> usize {
        self.data.get(block).successors.len()
    }

    /// Blocks in postorder starting from `entry`, the traversal every
    /// dataflow fixed point in this crate (liveness, dominators, memory SSA)
    /// iterates in reverse for fastest convergence.
    pub fn postorder(&self, entry: Block) -> Vec<Block> {
        let mut visited = rustc_hash::FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![(entry, self.succ_iter(entry).collect::<Vec<_>>().into_iter())];
        visited.insert(entry);
        while let Some((block, iter)) = stack.last_mut() {
            if let Some(succ) = iter.next() {
                if visited.insert(succ) {
                    let succs = self.succ_iter(succ).collect::<Vec<_>>().into_iter();
                    stack.push((succ, succs));
                }
            } else {
                order.push(*block);
                stack.pop();
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Opcode, Operand};

    fn jmp(target: Label) -> InstructionData {
        InstructionData::new(Opcode::Jmp, smallvec::smallvec![Operand::Label(target)], Default::default())
    }

    #[test]
    fn compute_links_successor_to_predecessor() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        let b1 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("b0"));
        func.dfg.set_block_label(b1, Label::new("b1"));
        func.layout.append_block(b0);
        func.layout.append_block(b1);
        let term = func.dfg.make_inst(jmp(Label::new("b1")));
        func.layout.append_inst(term, b0);
        let ret = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(ret, b1);

        let cfg = ControlFlowGraph::compute(&func);
        assert_eq!(cfg.succ_iter(b0).collect::<Vec<_>>(), vec![b1]);
        let preds: Vec<_> = cfg.pred_iter(b1).collect();
        assert_eq!(preds, vec![BlockPredecessor::new(b0, term)]);
    }
}
