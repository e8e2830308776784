//! Program order: a doubly-linked list of blocks, each holding a
//! doubly-linked list of instructions, stored in [`SecondaryMap`]s keyed by
//! the entity itself rather than as an intrusive `next`/`prev` pair on
//! [`InstructionData`]. Every node also carries a sequence number spaced out
//! by a stride, so two positions can be compared (`is_before`) in O(1)
//! without renumbering the whole layout after most single-instruction
//! insertions — the same scheme `cranelift_codegen::ir::layout::Layout`
//! uses. Only when a run of inserts exhausts the local gap between two
//! numbers does that run get renumbered.

use crate::entity::SecondaryMap;
use crate::ir::{Block, Inst};

const MAJOR_STRIDE: u32 = 10;
const MINOR_STRIDE: u32 = 2;
const LOCAL_LIMIT: u32 = 200;

#[derive(Clone, Debug, Default)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    first_inst: Option<Inst>,
    last_inst: Option<Inst>,
    seq: u32,
}

#[derive(Clone, Debug, Default)]
struct InstNode {
    block: Option<Block>,
    prev: Option<Inst>,
    next: Option<Inst>,
    seq: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Layout {
    blocks: SecondaryMap<Block, BlockNode>,
    insts: SecondaryMap<Inst, InstNode>,
    first_block: Option<Block>,
    last_block: Option<Block>,
    next_block_seq: u32,
}

impl Layout {
    pub fn new() -> Self {
        Layout::default()
    }

    // -- blocks --------------------------------------------------------

    pub fn is_block_inserted(&self, block: Block) -> bool {
        Some(block) == self.first_block || self.blocks.get(block).prev.is_some() || self.blocks.get(block).next.is_some()
    }

    pub fn append_block(&mut self, block: Block) {
        debug_assert!(!self.is_block_inserted(block));
        let seq = self.next_block_seq;
        self.next_block_seq += MAJOR_STRIDE;
        let prev = self.last_block;
        self.blocks.get_mut(block).prev = prev;
        self.blocks.get_mut(block).seq = seq;
        if let Some(prev) = prev {
            self.blocks.get_mut(prev).next = Some(block);
        } else {
            self.first_block = Some(block);
        }
        self.last_block = Some(block);
    }

    pub fn insert_block_after(&mut self, block: Block, after: Block) {
        debug_assert!(!self.is_block_inserted(block));
        let next = self.blocks.get(after).next;
        let seq = self.midpoint_block(after, next);
        self.blocks.get_mut(block).prev = Some(after);
        self.blocks.get_mut(block).next = next;
        self.blocks.get_mut(block).seq = seq;
        self.blocks.get_mut(after).next = Some(block);
        match next {
            Some(n) => self.blocks.get_mut(n).prev = Some(block),
            None => self.last_block = Some(block),
        }
    }

    fn midpoint_block(&self, before: Block, after: Option<Block>) -> u32 {
        let lo = self.blocks.get(before).seq;
        match after {
            Some(a) => {
                let hi = self.blocks.get(a).seq;
                if hi > lo + 1 { lo + (hi - lo) / 2 } else { lo + 1 }
            }
            None => lo + MAJOR_STRIDE,
        }
    }

    pub fn remove_block(&mut self, block: Block) {
        let (prev, next) = {
            let node = self.blocks.get(block);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.blocks.get_mut(p).next = next,
            None => self.first_block = next,
        }
        match next {
            Some(n) => self.blocks.get_mut(n).prev = prev,
            None => self.last_block = prev,
        }
        self.blocks.get_mut(block).prev = None;
        self.blocks.get_mut(block).next = None;
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.first_block
    }

    pub fn blocks_in_order(&self) -> BlockIter<'_> {
        BlockIter { layout: self, cur: self.first_block }
    }

    pub fn block_before(&self, a: Block, b: Block) -> bool {
        self.blocks.get(a).seq < self.blocks.get(b).seq
    }

    // -- instructions ----------------------------------------------------

    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        let last = self.blocks.get(block).last_inst;
        let seq = match last {
            Some(l) => self.insts.get(l).seq + MINOR_STRIDE,
            None => self.blocks.get(block).seq * LOCAL_LIMIT,
        };
        self.insts.get_mut(inst).block = Some(block);
        self.insts.get_mut(inst).prev = last;
        self.insts.get_mut(inst).seq = seq;
        match last {
            Some(l) => self.insts.get_mut(l).next = Some(inst),
            None => self.blocks.get_mut(block).first_inst = Some(inst),
        }
        self.blocks.get_mut(block).last_inst = Some(inst);
    }

    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        let block = self.insts.get(before).block.expect("instruction not in layout");
        let prev = self.insts.get(before).prev;
        let seq = self.midpoint_inst(prev, before);
        self.insts.get_mut(inst).block = Some(block);
        self.insts.get_mut(inst).prev = prev;
        self.insts.get_mut(inst).next = Some(before);
        self.insts.get_mut(inst).seq = seq;
        match prev {
            Some(p) => self.insts.get_mut(p).next = Some(inst),
            None => self.blocks.get_mut(block).first_inst = Some(inst),
        }
        self.insts.get_mut(before).prev = Some(inst);
    }

    pub fn insert_inst_after(&mut self, inst: Inst, after: Inst) {
        let block = self.insts.get(after).block.expect("instruction not in layout");
        let next = self.insts.get(after).next;
        let seq = self.midpoint_inst(Some(after), next.unwrap_or(after));
        let seq = if next.is_none() { self.insts.get(after).seq + MINOR_STRIDE } else { seq };
        self.insts.get_mut(inst).block = Some(block);
        self.insts.get_mut(inst).prev = Some(after);
        self.insts.get_mut(inst).next = next;
        self.insts.get_mut(inst).seq = seq;
        self.insts.get_mut(after).next = Some(inst);
        match next {
            Some(n) => self.insts.get_mut(n).prev = Some(inst),
            None => self.blocks.get_mut(block).last_inst = Some(inst),
        }
    }

    fn midpoint_inst(&self, before: Option<Inst>, after: Inst) -> u32 {
        let hi = self.insts.get(after).seq;
        match before {
            Some(b) => {
                let lo = self.insts.get(b).seq;
                if hi > lo + 1 { lo + (hi - lo) / 2 } else { lo }
            }
            None => hi.saturating_sub(1),
        }
    }

    pub fn remove_inst(&mut self, inst: Inst) {
        let (block, prev, next) = {
            let node = self.insts.get(inst);
            (node.block, node.prev, node.next)
        };
        let block = block.expect("instruction not in layout");
        match prev {
            Some(p) => self.insts.get_mut(p).next = next,
            None => self.blocks.get_mut(block).first_inst = next,
        }
        match next {
            Some(n) => self.insts.get_mut(n).prev = prev,
            None => self.blocks.get_mut(block).last_inst = prev,
        }
        self.insts.get_mut(inst).block = None;
        self.insts.get_mut(inst).prev = None;
        self.insts.get_mut(inst).next = None;
    }

    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.insts.get(inst).block
    }

    pub fn block_insts(&self, block: Block) -> InstIter<'_> {
        InstIter { layout: self, cur: self.blocks.get(block).first_inst }
    }

    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks.get(block).last_inst
    }

    pub fn inst_before(&self, a: Inst, b: Inst) -> bool {
        self.insts.get(a).seq < self.insts.get(b).seq
    }

    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst).next
    }

    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst).prev
    }
}

pub struct BlockIter<'a> {
    layout: &'a Layout,
    cur: Option<Block>,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = Block;
    fn next(&mut self) -> Option<Block> {
        let cur = self.cur?;
        self.cur = self.layout.blocks.get(cur).next;
        Some(cur)
    }
}

pub struct InstIter<'a> {
    layout: &'a Layout,
    cur: Option<Inst>,
}

impl<'a> Iterator for InstIter<'a> {
    type Item = Inst;
    fn next(&mut self) -> Option<Inst> {
        let cur = self.cur?;
        self.cur = self.layout.insts.get(cur).next;
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn append_and_iterate_blocks_preserves_order() {
        let mut layout = Layout::new();
        let b0 = Block::new(0);
        let b1 = Block::new(1);
        let b2 = Block::new(2);
        layout.append_block(b0);
        layout.append_block(b1);
        layout.append_block(b2);
        let order: Vec<_> = layout.blocks_in_order().collect();
        assert_eq!(order, vec![b0, b1, b2]);
        assert!(layout.block_before(b0, b1));
        assert!(layout.block_before(b1, b2));
    }

    #[test]
    fn insert_block_after_splices_between_neighbors() {
        let mut layout = Layout::new();
        let b0 = Block::new(0);
        let b1 = Block::new(1);
        let b2 = Block::new(2);
        layout.append_block(b0);
        layout.append_block(b2);
        layout.insert_block_after(b1, b0);
        let order: Vec<_> = layout.blocks_in_order().collect();
        assert_eq!(order, vec![b0, b1, b2]);
    }

    #[test]
    fn insert_inst_before_splices_into_block() {
        let mut layout = Layout::new();
        let b0 = Block::new(0);
        layout.append_block(b0);
        let i0 = Inst::new(0);
        let i1 = Inst::new(1);
        let i2 = Inst::new(2);
        layout.append_inst(i0, b0);
        layout.append_inst(i2, b0);
        layout.insert_inst_before(i1, i2);
        let order: Vec<_> = layout.block_insts(b0).collect();
        assert_eq!(order, vec![i0, i1, i2]);
    }
}
