//! Lowers the venom-only `dload`/`dloadbytes` pseudo ops — "read from the
//! contract's own data section" — into the real EVM instructions that do
//! that: a `codecopy` from a symbolic code offset into scratch memory,
//! followed (for `dload`) by an `mload` of the single word just copied.
//!
//! The data section's eventual offset inside the assembled bytecode isn't
//! known until the assembler lays out the final code, so the copy's source
//! address is computed by an `offset` instruction — a symbolic relocation
//! with an addend, resolved once the assembler knows where the named data
//! section landed, exactly the way [`crate::ir::context::DataItem::LabelRef`]
//! defers a cross-reference to assembly time rather than requiring the IR to
//! already know final code layout.

use smallvec::smallvec;

use crate::analysis::AnalysisCache;
use crate::ir::memloc::{AbstractMemLoc, MemLocKind};
use crate::ir::{Function, InstructionData, Label, Literal, Opcode, Operand};

const DATA_SECTION_LABEL: &str = "data";

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;
    let targets: Vec<_> = func
        .blocks()
        .flat_map(|b| func.layout.block_insts(b).collect::<Vec<_>>())
        .filter(|&i| matches!(func.dfg.opcode(i), Opcode::Dload | Opcode::Dloadbytes))
        .collect();

    for inst in targets {
        let data = func.dfg.inst_data(inst).clone();
        match data.opcode {
            Opcode::Dload => {
                let offset = data.operands[0].clone();
                let result = data.result().expect("dload always defines a result");

                let memloc = func.mem_locs.push(AbstractMemLoc::new(MemLocKind::Scratch, 32));
                let ptr = func.dfg.make_var();
                let alloca = func.dfg.make_inst(InstructionData::new(
                    Opcode::Alloca,
                    smallvec![
                        Operand::Literal(Literal::from_u64(memloc.as_u32() as u64)),
                        Operand::Literal(Literal::from_u64(32)),
                        Operand::Literal(Literal::zero()),
                    ],
                    smallvec![ptr],
                ));
                func.layout.insert_inst_before(alloca, inst);

                let base = func.dfg.make_var();
                let offset_inst = func.dfg.make_inst(InstructionData::new(
                    Opcode::Offset,
                    smallvec![Operand::Label(Label::new(DATA_SECTION_LABEL)), Operand::Literal(Literal::zero()), offset],
                    smallvec![base],
                ));
                func.layout.insert_inst_before(offset_inst, inst);

                let copy = func.dfg.make_inst(InstructionData::new(
                    Opcode::Codecopy,
                    smallvec![Operand::Var(ptr), Operand::Var(base), Operand::Literal(Literal::from_u64(32))],
                    Default::default(),
                ));
                func.layout.insert_inst_before(copy, inst);

                func.dfg.replace_inst(inst, InstructionData::new(Opcode::Mload, smallvec![Operand::Var(ptr)], smallvec![result]));
                changed = true;
            }
            Opcode::Dloadbytes => {
                let dst = data.operands[0].clone();
                let src_offset = data.operands[1].clone();
                let len = data.operands[2].clone();

                let base = func.dfg.make_var();
                let offset_inst = func.dfg.make_inst(InstructionData::new(
                    Opcode::Offset,
                    smallvec![Operand::Label(Label::new(DATA_SECTION_LABEL)), Operand::Literal(Literal::zero()), src_offset],
                    smallvec![base],
                ));
                func.layout.insert_inst_before(offset_inst, inst);

                func.dfg.replace_inst(
                    inst,
                    InstructionData::new(Opcode::Codecopy, smallvec![dst, Operand::Var(base), len], Default::default()),
                );
                changed = true;
            }
            _ => {}
        }
    }

    if changed {
        ac.invalidate_cfg();
        ac.invalidate_memory();
    }
    changed
}
