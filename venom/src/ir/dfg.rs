//! The data-flow graph: owns every instruction and variable definition in a
//! function, independent of their program order (that's [`crate::ir::layout::Layout`]'s
//! job). Split this way — following `cranelift_codegen::ir::dfg::DataFlowGraph` —
//! so a pass can ask "what defines this variable" or "what are this
//! instruction's operands" without also caring where in the block order
//! things sit.

use crate::entity::{PrimaryMap, SecondaryMap};
use crate::ir::{Block, Inst, InstructionData, Label, Opcode, Operand, Var};

/// Where a [`Var`] comes from: either it's the (or one of the) results of an
/// instruction, or it's a block parameter (a phi target, pre-phi-elimination,
/// or just a function argument for the entry block).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueDef {
    Result(Inst, usize),
    BlockParam(Block, usize),
}

#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub label: Option<Label>,
    pub params: Vec<Var>,
}

#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    insts: PrimaryMap<Inst, InstructionData>,
    blocks: PrimaryMap<Block, BlockData>,
    /// `None` until the owning var has been assigned a `ValueDef`, which
    /// happens at the same time as its defining instruction/block-param is
    /// created.
    value_defs: SecondaryMap<Var, Option<ValueDef>>,
    var_count: u32,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        DataFlowGraph::default()
    }

    // -- instructions --------------------------------------------------

    pub fn make_inst(&mut self, data: InstructionData) -> Inst {
        let inst = self.insts.push(InstructionData {
            opcode: data.opcode,
            operands: Default::default(),
            results: Default::default(),
        });
        let results = data.results.clone();
        self.insts[inst] = data;
        for (i, &var) in results.iter().enumerate() {
            self.set_value_def(var, ValueDef::Result(inst, i));
        }
        inst
    }

    pub fn inst_data(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst]
    }

    pub fn inst_data_mut(&mut self, inst: Inst) -> &mut InstructionData {
        &mut self.insts[inst]
    }

    pub fn opcode(&self, inst: Inst) -> Opcode {
        self.insts[inst].opcode
    }

    pub fn inst_results(&self, inst: Inst) -> &[Var] {
        &self.insts[inst].results
    }

    pub fn inst_operands(&self, inst: Inst) -> &[Operand] {
        &self.insts[inst].operands
    }

    /// Rewrite the `index`-th result of `inst` to a freshly-chosen `Var`,
    /// updating its definition site. Used exclusively by `MakeSSA` to split
    /// a variable that the frontend reassigned along different paths into
    /// one fresh SSA name per definition.
    pub fn rename_result(&mut self, inst: Inst, index: usize, new_var: Var) {
        self.insts[inst].results[index] = new_var;
        self.set_value_def(new_var, ValueDef::Result(inst, index));
    }

    pub fn replace_inst(&mut self, inst: Inst, data: InstructionData) {
        let old_results = self.insts[inst].results.clone();
        for v in old_results {
            *self.value_defs.get_mut(v) = None;
        }
        let results = data.results.clone();
        self.insts[inst] = data;
        for (i, &var) in results.iter().enumerate() {
            self.set_value_def(var, ValueDef::Result(inst, i));
        }
    }

    // -- variables -------------------------------------------------------

    /// Allocate a fresh, as-yet-undefined variable. Callers set its
    /// definition with [`DataFlowGraph::set_value_def`] once they know what
    /// instruction or block parameter it belongs to.
    pub fn make_var(&mut self) -> Var {
        let v = Var::from_u32(self.var_count);
        self.var_count += 1;
        v
    }

    pub fn set_value_def(&mut self, var: Var, def: ValueDef) {
        *self.value_defs.get_mut(var) = Some(def);
    }

    pub fn value_def(&self, var: Var) -> Option<ValueDef> {
        *self.value_defs.get(var)
    }

    pub fn num_vars(&self) -> usize {
        self.var_count as usize
    }

    // -- blocks ------------------------------------------------------------

    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    pub fn block_label(&self, block: Block) -> Option<&Label> {
        self.blocks[block].label.as_ref()
    }

    pub fn set_block_label(&mut self, block: Block, label: Label) {
        self.blocks[block].label = Some(label);
    }

    pub fn block_params(&self, block: Block) -> &[Var] {
        &self.blocks[block].params
    }

    pub fn append_block_param(&mut self, block: Block) -> Var {
        let var = self.make_var();
        let idx = self.blocks[block].params.len();
        self.blocks[block].params.push(var);
        self.set_value_def(var, ValueDef::BlockParam(block, idx));
        var
    }

    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks.keys()
    }

    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.insts.keys()
    }

    /// Scan every instruction and rewrite operand uses of `from` to `to` in
    /// one batched pass. This is the one replace-all-uses primitive every
    /// pass that eliminates a variable goes through, rather than each pass
    /// re-deriving a use list; keeping it batched (instead of maintaining an
    /// incremental use-def chain) keeps the data structure simple at the
    /// cost of an O(instructions) scan per replacement, which is acceptable
    /// because passes call this at most once per eliminated variable.
    pub fn replace_all_uses(&mut self, from: Var, to: Var) {
        for inst in self.insts.values_mut() {
            inst.replace_var_uses(from, to);
        }
    }
}
