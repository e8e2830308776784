//! A single function: its data-flow graph, its layout, and the abstract
//! memory locations it has allocated. Analyses and passes operate on one
//! `Function` at a time; [`crate::ir::context::Context`] is what ties many
//! functions, data sections, and the global memory allocator together.

use crate::ir::memloc::MemLocTable;
use crate::ir::{Block, DataFlowGraph, Label, Layout, Var};

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Label,
    pub dfg: DataFlowGraph,
    pub layout: Layout,
    pub mem_locs: MemLocTable,
    /// Formal parameters, as block parameters of the entry block. Kept
    /// separately too since the entry block's parameter list must not be
    /// touched by `PhiEliminationPass`/`Mem2Var` the way an ordinary block's
    /// is.
    pub params: Vec<Var>,
    /// `true` for the contract's single entry point; the pipeline measures
    /// the call graph and walks function passes starting here.
    pub is_entry: bool,
}

impl Function {
    pub fn new(name: impl Into<Label>) -> Self {
        Function {
            name: name.into(),
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
            mem_locs: MemLocTable::new(),
            params: Vec::new(),
            is_entry: false,
        }
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.layout.entry_block()
    }

    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.layout.blocks_in_order()
    }

    /// The block a label names, by linear scan. Functions are small enough,
    /// and this is called rarely enough outside of parsing and the call
    /// graph, that a cached index isn't worth the upkeep.
    pub fn block_by_label(&self, label: &Label) -> Option<Block> {
        self.blocks().find(|&b| self.dfg.block_label(b) == Some(label))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks().count()
    }
}
