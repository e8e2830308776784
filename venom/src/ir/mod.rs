//! The IR's data model: entities, opcodes, effects, operands, instructions,
//! the data-flow graph, program-order layout, functions, and the top-level
//! compilation context that owns them all.

pub mod context;
pub mod dfg;
pub mod effects;
pub mod entities;
pub mod function;
pub mod instruction;
pub mod layout;
pub mod memloc;
pub mod opcode;
pub mod operand;

pub use context::{Context, DataItem, DataSection, DeployInfo};
pub use dfg::{BlockData, DataFlowGraph, ValueDef};
pub use effects::{opcode_effects, EffectSet};
pub use entities::{Block, FuncId, Inst, Label, MemLocId, Var};
pub use function::Function;
pub use instruction::{
    memory_read_convention, memory_write_convention, successors_of, InstructionData,
    MemoryOperandConvention, OperandList, ResultList,
};
pub use layout::Layout;
pub use memloc::{AbstractMemLoc, MemLocKind, MemLocPlacement, MemLocTable};
pub use opcode::{Arity, Opcode};
pub use operand::{Literal, Operand, Word};
