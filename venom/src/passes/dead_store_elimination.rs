//! Removes a store that is certainly overwritten by a later store to the
//! same address in the same address space before anything could read the
//! first value. Tracked per basic block with the address compared by
//! operand identity (two literal operands of equal value, or the same SSA
//! variable) rather than full numeric alias analysis — sound, if less
//! precise than proving two different expressions alias.
//!
//! Anything that reads memory, or writes it through an opcode that also
//! reads it (`mcopy`, `calldatacopy`, ...), or has any other side effect
//! (a call, a log) invalidates every tracked store: the point after it could
//! observe values this pass has no way to rule out.
//!
//! A store to a location [`crate::ir::memloc::AbstractMemLoc::volatile`]
//! marks volatile is never removed, even when a later store to the same
//! address would otherwise make it dead — it tracks an address this pass
//! has no visibility into a read of. This only resolves addresses that are
//! still an `alloca`-family pointer at the time this pass runs (before
//! `ConcretizeMemLocPass` turns them into bare offsets); a store through any
//! other address is never volatile.

use rustc_hash::FxHashMap;

use crate::analysis::memssa::{addr_space_of, AddrSpace};
use crate::analysis::AnalysisCache;
use crate::ir::{memory_write_convention, opcode_effects, Function, Inst, MemLocId, Opcode, Operand};

fn addr_is_volatile(func: &Function, addr: &Operand) -> bool {
    let Some(var) = addr.as_var() else { return false };
    let Some(crate::ir::ValueDef::Result(def_inst, _)) = func.dfg.value_def(var) else { return false };
    let def_data = func.dfg.inst_data(def_inst);
    if !matches!(def_data.opcode, Opcode::Alloca | Opcode::Palloca | Opcode::Calloca) {
        return false;
    }
    let Some(index) = def_data.operands[0].as_literal() else { return false };
    let memloc = MemLocId::from_u32(index.0.to::<u32>());
    func.mem_locs.get(memloc).is_some_and(|loc| loc.volatile)
}

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut to_remove: Vec<Inst> = Vec::new();

    for block in func.blocks() {
        let mut last_store: FxHashMap<(AddrSpace, Operand), (Inst, bool)> = FxHashMap::default();
        for inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            let opcode = data.opcode;
            match opcode {
                Opcode::Mstore | Opcode::Mstore8 | Opcode::Sstore | Opcode::Tstore => {
                    let effects = opcode_effects(opcode);
                    let space = addr_space_of(&effects).expect("store opcode always has an address space");
                    let addr = data.operands[0].clone();
                    let volatile = addr_is_volatile(func, &addr);
                    let key = (space, addr);
                    if let Some(&(prev, prev_volatile)) = last_store.get(&key) {
                        if !prev_volatile {
                            to_remove.push(prev);
                        }
                    }
                    last_store.insert(key, (inst, volatile));
                }
                _ if opcode.can_load() || memory_write_convention(opcode).is_some() || opcode.other_side_effects() => {
                    last_store.clear();
                }
                _ => {}
            }
        }
    }

    let changed = !to_remove.is_empty();
    for inst in to_remove {
        func.layout.remove_inst(inst);
    }
    if changed {
        ac.invalidate_def_use();
        ac.invalidate_memory();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Opcode, Operand};
    use smallvec::smallvec;

    #[test]
    fn removes_store_overwritten_before_any_read() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let addr = Operand::Literal(Literal::from_u64(0));
        let first = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![addr.clone(), Operand::Literal(Literal::from_u64(1))],
            Default::default(),
        ));
        func.layout.append_inst(first, b0);
        let second = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![addr, Operand::Literal(Literal::from_u64(2))],
            Default::default(),
        ));
        func.layout.append_inst(second, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        assert_eq!(func.layout.block_insts(b0).collect::<Vec<_>>(), vec![second]);
    }

    #[test]
    fn volatile_store_survives_being_immediately_overwritten() {
        use crate::ir::memloc::{AbstractMemLoc, MemLocKind};

        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let loc = func.mem_locs.push(AbstractMemLoc::new(MemLocKind::Scratch, 32).volatile());
        let ptr = func.dfg.make_var();
        let alloca = func.dfg.make_inst(InstructionData::new(
            Opcode::Alloca,
            smallvec![
                Operand::Literal(Literal::from_u64(loc.as_u32() as u64)),
                Operand::Literal(Literal::from_u64(32)),
                Operand::Literal(Literal::zero()),
            ],
            smallvec![ptr],
        ));
        func.layout.append_inst(alloca, b0);

        let addr = Operand::Var(ptr);
        let first = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![addr.clone(), Operand::Literal(Literal::from_u64(1))],
            Default::default(),
        ));
        func.layout.append_inst(first, b0);
        let second = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![addr, Operand::Literal(Literal::from_u64(2))],
            Default::default(),
        ));
        func.layout.append_inst(second, b0);

        let mut ac = AnalysisCache::new();
        assert!(!run(&mut ac, &mut func));
        assert_eq!(func.layout.block_insts(b0).collect::<Vec<_>>(), vec![alloca, first, second]);
    }
}
