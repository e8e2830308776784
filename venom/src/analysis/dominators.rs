//! The dominator tree, computed with Cooper, Harvey & Kennedy's "simple,
//! fast dominance" iterative fixed point, plus the dominance frontiers built
//! on top of it that SSA construction needs to know where to place phis.

use rustc_hash::FxHashMap;

use crate::analysis::cfg::ControlFlowGraph;
use crate::entity::SecondaryMap;
use crate::ir::{Block, Function};

#[derive(Clone, Debug, Default)]
struct DomNode {
    rpo_number: u32,
    idom: Option<Block>,
}

#[derive(Clone, Debug, Default)]
pub struct DominatorTree {
    nodes: SecondaryMap<Block, DomNode>,
    postorder: Vec<Block>,
    frontiers: SecondaryMap<Block, Vec<Block>>,
    reachable: FxHashMap<Block, ()>,
}

impl DominatorTree {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let Some(entry) = func.entry_block() else {
            return DominatorTree::default();
        };
        let postorder = cfg.postorder(entry);
        let mut tree = DominatorTree::default();
        tree.reachable = postorder.iter().map(|&b| (b, ())).collect();

        // rpo_number: higher = earlier in reverse postorder (the entry gets
        // the highest number), matching the convention `common_dominator`
        // below relies on.
        for (i, &block) in postorder.iter().enumerate() {
            tree.nodes.get_mut(block).rpo_number = (postorder.len() - i) as u32;
        }
        tree.nodes.get_mut(entry).idom = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            // Visit in reverse postorder (skip the entry).
            for &block in postorder.iter().rev().skip(1) {
                let mut new_idom: Option<Block> = None;
                for pred in cfg.pred_iter(block) {
                    if !tree.reachable.contains_key(&pred.block) {
                        continue;
                    }
                    if tree.nodes.get(pred.block).idom.is_none() && pred.block != entry {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred.block,
                        Some(cur) => tree.intersect(cur, pred.block),
                    });
                }
                if tree.nodes.get(block).idom != new_idom {
                    tree.nodes.get_mut(block).idom = new_idom;
                    changed = true;
                }
            }
        }

        tree.postorder = postorder;
        tree.compute_frontiers(func, cfg);
        tree
    }

    fn intersect(&self, mut a: Block, mut b: Block) -> Block {
        loop {
            match self.nodes.get(a).rpo_number.cmp(&self.nodes.get(b).rpo_number) {
                std::cmp::Ordering::Greater => {
                    b = self.nodes.get(b).idom.expect("idom of reachable block must be set");
                }
                std::cmp::Ordering::Less => {
                    a = self.nodes.get(a).idom.expect("idom of reachable block must be set");
                }
                std::cmp::Ordering::Equal => return a,
            }
        }
    }

    fn compute_frontiers(&mut self, func: &Function, cfg: &ControlFlowGraph) {
        for block in func.blocks() {
            if cfg.pred_count(block) < 2 || !self.reachable.contains_key(&block) {
                continue;
            }
            for pred in cfg.pred_iter(block) {
                if !self.reachable.contains_key(&pred.block) {
                    continue;
                }
                let mut runner = pred.block;
                let idom_of_block = self.nodes.get(block).idom;
                while Some(runner) != idom_of_block {
                    self.frontiers.get_mut(runner).push(block);
                    runner = match self.nodes.get(runner).idom {
                        Some(i) => i,
                        None => break,
                    };
                    if Some(runner) == idom_of_block {
                        break;
                    }
                }
            }
        }
        let blocks: Vec<Block> = self.postorder.clone();
        for b in blocks {
            let frontier = self.frontiers.get_mut(b);
            frontier.sort_unstable_by_key(|b| b.as_u32());
            frontier.dedup();
        }
    }

    pub fn idom(&self, block: Block) -> Option<Block> {
        self.nodes.get(block).idom
    }

    pub fn is_reachable(&self, block: Block) -> bool {
        self.reachable.contains_key(&block)
    }

    pub fn dominance_frontier(&self, block: Block) -> &[Block] {
        self.frontiers.get(block)
    }

    /// `a` dominates `b` if `a` is on `b`'s chain of immediate dominators
    /// (every block dominates itself).
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if !self.is_reachable(b) {
            return false;
        }
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.nodes.get(cur).idom {
                Some(idom) if idom != cur => cur = idom,
                _ => return cur == a,
            }
        }
    }

    pub fn reverse_postorder(&self) -> impl Iterator<Item = Block> + '_ {
        self.postorder.iter().rev().copied()
    }
}
