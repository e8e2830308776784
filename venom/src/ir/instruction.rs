//! Instruction data: an opcode, its operands, and the variable(s) it
//! defines.
//!
//! Phi nodes store their operands as alternating `(Label, Var)` pairs — one
//! per predecessor block — rather than a separate side table, so every
//! instruction, phi or not, is walked the same way by the editing
//! primitives, the printer, and the passes that rewrite operands in place.
//! `invoke` is the one opcode that can define more than one variable (a
//! call into a function with multiple return values), which is why results
//! are a small vector rather than a single `Option<Var>`.

use smallvec::SmallVec;

use crate::ir::{Block, Label, Opcode, Operand, Var};

pub type OperandList = SmallVec<[Operand; 4]>;
pub type ResultList = SmallVec<[Var; 1]>;

#[derive(Clone, Debug)]
pub struct InstructionData {
    pub opcode: Opcode,
    pub operands: OperandList,
    pub results: ResultList,
}

impl InstructionData {
    pub fn new(opcode: Opcode, operands: OperandList, results: ResultList) -> Self {
        InstructionData { opcode, operands, results }
    }

    pub fn nullary(opcode: Opcode, result: Option<Var>) -> Self {
        InstructionData {
            opcode,
            operands: OperandList::new(),
            results: result.into_iter().collect(),
        }
    }

    pub fn result(&self) -> Option<Var> {
        self.results.first().copied()
    }

    pub fn var_operands(&self) -> impl Iterator<Item = Var> + '_ {
        self.operands.iter().filter_map(|o| o.as_var())
    }

    /// Iterate a phi's `(predecessor, incoming value)` pairs. Panics if this
    /// instruction isn't a `phi` — callers are expected to have checked
    /// `opcode.is_phi()` already, matching the rest of the IR's
    /// "well-formed by construction" discipline.
    pub fn phi_args(&self) -> impl Iterator<Item = (&Label, Var)> + '_ {
        assert!(self.opcode.is_phi(), "phi_args called on non-phi instruction");
        self.operands.chunks(2).map(|pair| {
            let label = pair[0].as_label().expect("phi operand 0 must be a label");
            let var = pair[1].as_var().expect("phi operand 1 must be a var");
            (label, var)
        })
    }

    pub fn push_phi_arg(&mut self, pred_label: Label, value: Var) {
        self.operands.push(Operand::Label(pred_label));
        self.operands.push(Operand::Var(value));
    }

    /// Remove the incoming value from a no-longer-existing predecessor,
    /// used when `SimplifyCFGPass` folds away a block.
    pub fn remove_phi_arg_from(&mut self, pred_label: &Label) {
        assert!(self.opcode.is_phi());
        if let Some(idx) = self
            .operands
            .chunks(2)
            .position(|pair| pair[0].as_label() == Some(pred_label))
        {
            self.operands.drain(idx * 2..idx * 2 + 2);
        }
    }

    /// Jump targets among this instruction's operands, in operand order
    /// (for a `jnz`, operand 1 is the true target and operand 2 the false
    /// target; for a `jmp`, operand 0 is the sole target).
    pub fn branch_targets(&self) -> impl Iterator<Item = &Label> + '_ {
        let start = if self.opcode == Opcode::Jnz { 1 } else { 0 };
        self.operands
            .iter()
            .skip(start)
            .filter_map(|o| o.as_label())
    }

    pub fn replace_var_uses(&mut self, from: Var, to: Var) {
        for op in self.operands.iter_mut() {
            if op.as_var() == Some(from) {
                *op = Operand::Var(to);
            }
        }
    }
}

/// Which operand, if any, holds the memory address/size a load or store
/// touches. Grounded directly in the per-opcode operand conventions used by
/// the frontend's memory checker: `mstore addr value` writes through operand
/// 0, `mload addr` reads operand 0, `calldatacopy dst src len` writes `dst`
/// and reads `len` bytes of calldata starting at `src`, and so on. Memory
/// SSA and dead-store elimination both need this to find "the address" at
/// all.
#[derive(Copy, Clone, Debug)]
pub struct MemoryOperandConvention {
    /// Operand index of the destination address (for stores/copies) or the
    /// source address (for loads).
    pub addr_operand: usize,
    /// Operand index of an explicit byte length, if the opcode takes one.
    pub size_operand: Option<usize>,
}

pub fn memory_write_convention(op: Opcode) -> Option<MemoryOperandConvention> {
    use Opcode::*;
    match op {
        Mstore | Mstore8 => Some(MemoryOperandConvention { addr_operand: 0, size_operand: None }),
        Sstore | Tstore => Some(MemoryOperandConvention { addr_operand: 0, size_operand: None }),
        Mcopy => Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(2) }),
        Calldatacopy | Codecopy | Returndatacopy => {
            Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(2) })
        }
        Extcodecopy => Some(MemoryOperandConvention { addr_operand: 1, size_operand: Some(3) }),
        Dloadbytes => Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(2) }),
        Call | Delegatecall | Staticcall => {
            Some(MemoryOperandConvention { addr_operand: 0, size_operand: None })
        }
        Create => Some(MemoryOperandConvention { addr_operand: 1, size_operand: Some(2) }),
        Create2 => Some(MemoryOperandConvention { addr_operand: 1, size_operand: Some(2) }),
        Return | Revert => Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(1) }),
        Sha3 => Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(1) }),
        Log0 | Log1 | Log2 | Log3 | Log4 => {
            Some(MemoryOperandConvention { addr_operand: 0, size_operand: Some(1) })
        }
        _ => None,
    }
}

pub fn memory_read_convention(op: Opcode) -> Option<MemoryOperandConvention> {
    use Opcode::*;
    match op {
        Mload => Some(MemoryOperandConvention { addr_operand: 0, size_operand: None }),
        Sload | Tload => Some(MemoryOperandConvention { addr_operand: 0, size_operand: None }),
        Dload => Some(MemoryOperandConvention { addr_operand: 0, size_operand: None }),
        _ => memory_write_convention(op).filter(|_| op.can_load()),
    }
}

/// Basic-block terminator shape, used by `check_venom`-style structural
/// validation (§ invariant I-1: every block ends in exactly one
/// terminator) and by the CFG builder to discover successors.
pub fn successors_of(term: &InstructionData, label_to_block: impl Fn(&Label) -> Option<Block>) -> SmallVec<[Block; 2]> {
    term.branch_targets().filter_map(|l| label_to_block(l)).collect()
}
