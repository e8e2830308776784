//! Load-to-load forwarding: a second load of an address already loaded
//! earlier in the same block, with no intervening write to that address
//! (or barrier), reuses the first load's result instead of reading again.
//! The complement of [`crate::passes::load_elimination`], which forwards a
//! store's value instead of a prior load's.

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::analysis::memssa::AddrSpace;
use crate::analysis::AnalysisCache;
use crate::ir::{memory_write_convention, Function, InstructionData, Opcode, Operand, Var};

pub fn run(ac: &mut AnalysisCache, func: &mut Function) -> bool {
    let mut changed = false;

    for block in func.blocks() {
        let mut known: FxHashMap<(AddrSpace, Operand), Var> = FxHashMap::default();
        let insts: Vec<_> = func.layout.block_insts(block).collect();
        for inst in insts {
            let data = func.dfg.inst_data(inst).clone();
            let opcode = data.opcode;
            let space = match opcode {
                Opcode::Mload | Opcode::Mstore => Some(AddrSpace::Memory),
                Opcode::Sload | Opcode::Sstore => Some(AddrSpace::Storage),
                Opcode::Tload | Opcode::Tstore => Some(AddrSpace::Transient),
                _ => None,
            };
            match (opcode, space) {
                (Opcode::Mload, Some(space)) | (Opcode::Sload, Some(space)) | (Opcode::Tload, Some(space)) => {
                    let addr = data.operands[0].clone();
                    let key = (space, addr.clone());
                    if let Some(&earlier) = known.get(&key) {
                        let result = data.result().expect("load always defines a result");
                        func.dfg.replace_inst(
                            inst,
                            InstructionData::new(Opcode::Assign, smallvec![Operand::Var(earlier)], smallvec![result]),
                        );
                        changed = true;
                    } else {
                        let result = data.result().expect("load always defines a result");
                        known.insert(key, result);
                    }
                }
                (Opcode::Mstore, Some(space)) | (Opcode::Sstore, Some(space)) | (Opcode::Tstore, Some(space)) => {
                    let addr = data.operands[0].clone();
                    known.remove(&(space, addr));
                }
                _ if opcode.can_load() || memory_write_convention(opcode).is_some() || opcode.other_side_effects() => {
                    known.clear();
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
