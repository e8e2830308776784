//! Assigns every `alloca`/`palloca`/`calloca` a concrete byte offset and
//! rewrites it to `assign result = <offset>`.
//!
//! An `alloca`-family instruction's first operand is a literal holding the
//! index of the [`MemLocId`] it reserves (the frontend allocates the
//! `MemLocId` itself and records its size in [`Function::mem_locs`]; the
//! instruction just carries a reference to it), its second operand the size
//! in bytes (redundant with the table, kept so the instruction is
//! self-describing when printed), and its third a reserved literal unused by
//! `Alloca` itself. This pass doesn't distinguish the three opcodes — a
//! `palloca`/`calloca` is an `alloca` with a frontend-assigned meaning
//! (respectively: a slot for an incoming parameter, a slot for an outgoing
//! call argument) that has no bearing on where it lives in memory.
//!
//! Takes the context's shared [`MemAllocator`] explicitly rather than
//! through [`crate::analysis::AnalysisCache`] like the rest of the pass
//! pipeline: memory is one address space shared by every function in the
//! contract, so placement has to be driven by the pipeline across all of
//! them, not scheduled as an independent per-function pass.

use smallvec::smallvec;

use crate::ir::{Function, InstructionData, Literal, MemLocId, Opcode, Operand};
use crate::memalloc::MemAllocator;

pub fn run(allocator: &mut MemAllocator, func: &mut Function) -> bool {
    let mut changed = false;
    let targets: Vec<_> = func
        .blocks()
        .flat_map(|b| func.layout.block_insts(b).collect::<Vec<_>>())
        .filter(|&i| matches!(func.dfg.opcode(i), Opcode::Alloca | Opcode::Palloca | Opcode::Calloca))
        .collect();

    for inst in targets {
        let data = func.dfg.inst_data(inst).clone();
        let index = data.operands[0]
            .as_literal()
            .expect("alloca-family operand 0 is always a memloc index literal")
            .0
            .to::<u32>();
        let memloc = MemLocId::from_u32(index);
        let size = func.mem_locs[memloc].size;
        let placement = allocator.placement_of(memloc).unwrap_or_else(|| allocator.allocate(memloc, size));
        let result = data.result().expect("alloca-family instructions always define a result");

        func.dfg.replace_inst(
            inst,
            InstructionData::new(
                Opcode::Assign,
                smallvec![Operand::Literal(Literal::from_u64(placement.offset as u64))],
                smallvec![result],
            ),
        );
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::memloc::{AbstractMemLoc, MemLocKind};
    use crate::ir::Label;

    #[test]
    fn assigns_sequential_offsets() {
        let mut func = Function::new(Label::new("f"));
        let entry = func.dfg.make_block();
        func.layout.append_block(entry);

        let loc_a = func.mem_locs.push(AbstractMemLoc::new(MemLocKind::Alloca, 32));
        let loc_b = func.mem_locs.push(AbstractMemLoc::new(MemLocKind::Alloca, 32));

        let ptr_a = func.dfg.make_var();
        let alloca_a = func.dfg.make_inst(InstructionData::new(
            Opcode::Alloca,
            smallvec![
                Operand::Literal(Literal::from_u64(loc_a.as_u32() as u64)),
                Operand::Literal(Literal::from_u64(32)),
                Operand::Literal(Literal::zero()),
            ],
            smallvec![ptr_a],
        ));
        func.layout.append_inst(alloca_a, entry);

        let ptr_b = func.dfg.make_var();
        let alloca_b = func.dfg.make_inst(InstructionData::new(
            Opcode::Alloca,
            smallvec![
                Operand::Literal(Literal::from_u64(loc_b.as_u32() as u64)),
                Operand::Literal(Literal::from_u64(32)),
                Operand::Literal(Literal::zero()),
            ],
            smallvec![ptr_b],
        ));
        func.layout.append_inst(alloca_b, entry);

        let mut allocator = MemAllocator::new();
        assert!(run(&mut allocator, &mut func));

        assert_eq!(func.dfg.inst_data(alloca_a).opcode, Opcode::Assign);
        assert_eq!(func.dfg.inst_data(alloca_a).operands[0], Operand::Literal(Literal::from_u64(0)));
        assert_eq!(func.dfg.inst_data(alloca_b).operands[0], Operand::Literal(Literal::from_u64(32)));
    }
}
