//! Store-to-load forwarding: a load whose address exactly matches a store
//! that reaches it with nothing in between that could have changed that
//! address's contents is replaced by an `assign` of the value the store
//! wrote, instead of re-reading it. Tracked per block like
//! [`crate::passes::dead_store_elimination`]; a load whose reaching store
//! isn't known (a block with more than one predecessor, or anything that
//! barriers the space first) is left alone.

use smallvec::smallvec;

use crate::analysis::memssa::AddrSpace;
use crate::analysis::AnalysisCache;
use crate::ir::{memory_write_convention, Function, InstructionData, Opcode, Operand};
use rustc_hash::FxHashMap;

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;

    for block in func.blocks() {
        let mut reaching: FxHashMap<(AddrSpace, Operand), Operand> = FxHashMap::default();
        let insts: Vec<_> = func.layout.block_insts(block).collect();
        for inst in insts {
            let data = func.dfg.inst_data(inst).clone();
            let opcode = data.opcode;
            let space = match opcode {
                Opcode::Mstore | Opcode::Mload => Some(AddrSpace::Memory),
                Opcode::Sstore | Opcode::Sload => Some(AddrSpace::Storage),
                Opcode::Tstore | Opcode::Tload => Some(AddrSpace::Transient),
                _ => None,
            };
            match (opcode, space) {
                (Opcode::Mstore, Some(space)) | (Opcode::Sstore, Some(space)) | (Opcode::Tstore, Some(space)) => {
                    let addr = data.operands[0].clone();
                    let value = data.operands[1].clone();
                    reaching.insert((space, addr), value);
                }
                (Opcode::Mload, Some(space)) | (Opcode::Sload, Some(space)) | (Opcode::Tload, Some(space)) => {
                    let addr = data.operands[0].clone();
                    if let Some(value) = reaching.get(&(space, addr)).cloned() {
                        let result = data.result().expect("load always defines a result");
                        func.dfg.replace_inst(
                            inst,
                            InstructionData::new(Opcode::Assign, smallvec![value], smallvec![result]),
                        );
                        changed = true;
                    }
                }
                _ if opcode.can_load() || memory_write_convention(opcode).is_some() || opcode.other_side_effects() => {
                    reaching.clear();
                }
                _ => {}
            }
        }
    }

    if changed {
        ac.invalidate_def_use();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstructionData, Label, Literal, Opcode, Operand};

    #[test]
    fn forwards_stored_value_to_matching_load() {
        let mut func = Function::new("f");
        let b0 = func.dfg.make_block();
        func.dfg.set_block_label(b0, Label::new("entry"));
        func.layout.append_block(b0);

        let addr = Operand::Literal(Literal::from_u64(0));
        let value = Operand::Literal(Literal::from_u64(7));
        let store = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![addr.clone(), value],
            Default::default(),
        ));
        func.layout.append_inst(store, b0);
        let result = func.dfg.make_var();
        let load = func.dfg.make_inst(InstructionData::new(Opcode::Mload, smallvec![addr], smallvec![result]));
        func.layout.append_inst(load, b0);

        let mut ac = AnalysisCache::new();
        assert!(run(&mut ac, &mut func));
        let data = func.dfg.inst_data(load);
        assert_eq!(data.opcode, Opcode::Assign);
        assert_eq!(data.operands[0].as_literal().unwrap().0, Literal::from_u64(7).0);
    }
}
