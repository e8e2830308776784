//! The stack scheduler & assembler (spec module C9): the last stage of the
//! pipeline, turning a function already reduced to single-use operands
//! ([`crate::passes::single_use_expansion`]) and a canonical block order
//! ([`crate::passes::cfg_normalization`]) into a flat list of EVM assembly
//! tokens.
//!
//! Grounded in the same "simulate the machine state a basic-block scheduler
//! targets" shape `cranelift-codegen`'s lowering/regalloc backend uses, cut
//! down to what a stack machine (rather than a register machine) actually
//! needs: no register classes or physical assignment, just a
//! [`stack::SymbolicStack`] tracking which [`Var`] sits how many slots below
//! the top, and a `DUP`/`SWAP`/`POP` plan to bring each instruction's
//! operands into position.
//!
//! Internal function calls that survive the inliner (any `invoke` the
//! budget in [`crate::inline`] declined) are lowered here using a
//! stack-carried return address: the call site pushes the label of its own
//! continuation, jumps to the callee, and the callee's `ret` brings that
//! same value back to the top and jumps through it. This part of the
//! scheduler is a from-scratch design rather than a transcription — no
//! assembler source was available to ground it in — chosen because it
//! reuses the scheduler's own generic "track a value until its last use"
//! machinery instead of a separate mechanism.

pub mod stack;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::analysis::{AnalysisCache, Liveness};
use crate::entity::EntityRef;
use crate::ir::{Block, Context, FuncId, Function, Inst, InstructionData, Label, Opcode, Operand, Var, Word};
use crate::memalloc::MemAllocator;
use crate::result::{ErrorGroup, VenomError};
use stack::{SymbolicStack, MAX_STACK_REACH};

/// One element of the flat assembly stream described in the spec's external
/// interface: a mnemonic, a push immediate, a reference to (or definition
/// of) a label, or nested sub-code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyToken {
    /// An opcode mnemonic, e.g. `"ADD"`, `"JUMPDEST"`.
    Op(&'static str),
    /// A `PUSH` immediate; the downstream byte-assembler picks `PUSH1..32`
    /// by the value's width.
    Push(Word),
    /// A use of a label as a jump target or push operand.
    LabelRef(Label),
    /// The point a label refers to — conventionally followed immediately by
    /// a `JUMPDEST` token, kept distinct so the byte-assembler's symbol
    /// table doesn't have to infer label positions from `JUMPDEST`
    /// placement.
    LabelDef(Label),
    /// Nested init-code for `create`/`create2`. Never produced by this
    /// pipeline (no sub-contract lowering is implemented here) but part of
    /// the token vocabulary the output contract promises downstream
    /// consumers.
    SubCode(Vec<AssemblyToken>),
}

/// The value our tracked return-address slot carries through a non-inlined
/// callee. Not a real `Var` the frontend ever produces — `u32::MAX` is far
/// past any index [`crate::ir::DataFlowGraph::make_var`] will reach — it
/// exists purely so [`stack::SymbolicStack`]'s ordinary bring-to-top
/// machinery can carry it like any other live value.
fn return_addr_var() -> Var {
    Var::from_u32(u32::MAX)
}

#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("instruction requires a value more than {MAX_STACK_REACH} deep, beyond SWAP/DUP's reach")]
    StackTooDeep(Inst),
    #[error("function {0} has no entry block to schedule from")]
    NoEntryBlock(Label),
}

/// Schedule every function in `ctx`, entry function first, and concatenate
/// their token streams.
pub fn schedule_context(ctx: &Context, allocator: &mut MemAllocator) -> Result<Vec<AssemblyToken>, ErrorGroup> {
    let mut errors = ErrorGroup::new();
    let mut tokens = Vec::new();

    let mut order: Vec<FuncId> = ctx.entry_function().into_iter().collect();
    order.extend(ctx.function_ids().filter(|&id| Some(id) != ctx.entry_function()));

    for fid in order {
        let func = ctx.function(fid);
        match schedule_function(func, allocator) {
            Ok(mut func_tokens) => tokens.append(&mut func_tokens),
            Err(e) => errors.push(VenomError::Other(format!("{}: {e}", func.name))),
        }
    }
    errors.into_result().map(|()| tokens)
}

/// Schedule a single function: linearize its blocks (already in final order
/// by the time [`crate::passes::cfg_normalization`] has run), simulate the
/// operand stack through each one, and return its token stream.
pub fn schedule_function(func: &Function, allocator: &mut MemAllocator) -> Result<Vec<AssemblyToken>, SchedulerError> {
    let Some(entry) = func.entry_block() else {
        return Err(SchedulerError::NoEntryBlock(func.name.clone()));
    };

    let mut ac = AnalysisCache::new();
    let liveness = ac.liveness(func);

    let mut sched = FunctionScheduler {
        func,
        liveness,
        allocator,
        spilled: FxHashMap::default(),
        next_spill_id: 0,
        entry_stack: FxHashMap::default(),
        internal_label_counter: 0,
    };

    // A function reachable only by `invoke` (not the contract's entry
    // point) is entered with its return address already pushed beneath its
    // arguments, last argument topmost; the true program entry starts from
    // an empty stack.
    let mut initial = Vec::new();
    if !func.is_entry {
        initial.push(return_addr_var());
    }
    initial.extend(func.params.iter().copied());
    sched.entry_stack.insert(entry, initial);

    let mut tokens = Vec::new();
    for block in func.blocks() {
        sched.schedule_block(block, &mut tokens)?;
    }
    Ok(tokens)
}

struct FunctionScheduler<'a> {
    func: &'a Function,
    liveness: Rc<Liveness>,
    allocator: &'a mut MemAllocator,
    /// Spill-by-value bookkeeping: a var that fell out of `DUP`/`SWAP`
    /// reach is written to a dedicated byte offset here instead.
    spilled: FxHashMap<Var, usize>,
    next_spill_id: u32,
    /// The canonical stack layout recorded for a block the first time any
    /// predecessor reaches it; a later predecessor (typically a loop
    /// back-edge) shuffles its own exit stack to match instead of each
    /// predecessor picking its own order.
    entry_stack: FxHashMap<Block, Vec<Var>>,
    internal_label_counter: u32,
}

impl<'a> FunctionScheduler<'a> {
    fn fresh_label(&mut self, purpose: &str) -> Label {
        self.internal_label_counter += 1;
        Label::new(format!("{}.{purpose}{}", self.func.name, self.internal_label_counter))
    }

    fn block_label(&self, block: Block) -> Label {
        self.func
            .dfg
            .block_label(block)
            .cloned()
            .unwrap_or_else(|| Label::new(format!("{}.bb{}", self.func.name, block.index())))
    }

    fn schedule_block(&mut self, block: Block, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        let label = self.block_label(block);
        tokens.push(AssemblyToken::LabelDef(label));
        tokens.push(AssemblyToken::Op("JUMPDEST"));

        let mut stack = SymbolicStack::new();
        for &v in self.entry_stack.get(&block).expect("every scheduled block has a recorded entry layout") {
            stack.push(v);
        }

        let insts: Vec<Inst> = self.func.layout.block_insts(block).collect();
        let (body, term) = insts.split_at(insts.len() - 1);
        let term = term[0];

        for &inst in body {
            self.schedule_instruction(inst, block, &mut stack, tokens)?;
        }
        self.schedule_terminator(term, block, &mut stack, tokens)?;
        Ok(())
    }

    /// Bring `var` to the top of `stack`, reloading it from its spill slot
    /// first if it isn't currently tracked there.
    fn materialize(&mut self, inst: Inst, var: Var, duplicate: bool, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        if stack.position_from_top(var).is_none() {
            let offset = *self.spilled.get(&var).expect("value neither on stack nor spilled");
            tokens.push(AssemblyToken::Push(Word::from(offset as u64)));
            tokens.push(AssemblyToken::Op("MLOAD"));
            stack.push(var);
            self.spilled.remove(&var);
        }
        match stack.bring_to_top(var, duplicate, tokens) {
            Some(_) => Ok(()),
            None => Err(SchedulerError::StackTooDeep(inst)),
        }
    }

    /// Keep the live working set within [`MAX_STACK_REACH`] by spilling the
    /// deepest tracked value to memory whenever it's about to fall out of
    /// reach. Spill slots are given offsets in a numbering band well past
    /// anything [`crate::passes::concretize_memloc`] placed, so they never
    /// alias a real abstract location.
    fn spill_if_needed(&mut self, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) {
        while stack.len() > MAX_STACK_REACH {
            let Some(victim) = stack.deepest() else { break };
            let depth_from_bottom = stack.take(victim);
            let real_depth = (stack.len() - depth_from_bottom).min(MAX_STACK_REACH - 1);
            stack.push(victim);
            stack.swap_to_depth(stack.len() - 1 - real_depth, tokens);
            stack.pop();
            self.next_spill_id += 1;
            let offset = self.allocator.eom + (self.next_spill_id as usize) * 32 + 1_000_000;
            tokens.push(AssemblyToken::Push(Word::from(offset as u64)));
            tokens.push(AssemblyToken::Op("MSTORE"));
            self.spilled.insert(victim, offset);
        }
    }

    fn schedule_instruction(&mut self, inst: Inst, block: Block, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        let data = self.func.dfg.inst_data(inst).clone();

        match data.opcode {
            Opcode::Assign => {
                let result = data.result().expect("assign always defines a result");
                match &data.operands[0] {
                    Operand::Var(src) => {
                        self.materialize(inst, *src, true, stack, tokens)?;
                        stack.pop();
                        stack.push(result);
                    }
                    Operand::Literal(lit) => {
                        tokens.push(AssemblyToken::Push(lit.0));
                        stack.push(result);
                    }
                    Operand::Label(l) => {
                        tokens.push(AssemblyToken::LabelRef(l.clone()));
                        stack.push(result);
                    }
                }
            }
            Opcode::Assert => {
                let cond = data.operands[0].as_var().expect("assert's operand is always a var");
                self.materialize(inst, cond, false, stack, tokens)?;
                tokens.push(AssemblyToken::Op("ISZERO"));
                let ok_label = self.fresh_label("assert_ok");
                tokens.push(AssemblyToken::LabelRef(ok_label.clone()));
                tokens.push(AssemblyToken::Op("JUMPI"));
                tokens.push(AssemblyToken::Push(Word::ZERO));
                tokens.push(AssemblyToken::Push(Word::ZERO));
                tokens.push(AssemblyToken::Op("REVERT"));
                tokens.push(AssemblyToken::LabelDef(ok_label));
                tokens.push(AssemblyToken::Op("JUMPDEST"));
            }
            Opcode::Invoke => self.schedule_invoke(inst, &data, block, stack, tokens)?,
            _ => self.schedule_generic(inst, &data, block, stack, tokens)?,
        }
        self.spill_if_needed(stack, tokens);
        Ok(())
    }

    fn schedule_generic(&mut self, inst: Inst, data: &InstructionData, block: Block, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        // Operands prepare in reverse so the first-listed operand ends up on
        // top, matching the calling convention every instruction's printed
        // form assumes (`op a, b, c` reads top-to-bottom as `a, b, c`).
        for operand in data.operands.iter().rev() {
            match operand {
                Operand::Var(v) => {
                    let keep = self.liveness.is_live_after(inst, *v) || self.liveness.is_live_out(block, *v);
                    self.materialize(inst, *v, keep, stack, tokens)?;
                }
                Operand::Literal(lit) => tokens.push(AssemblyToken::Push(lit.0)),
                Operand::Label(l) => tokens.push(AssemblyToken::LabelRef(l.clone())),
            }
        }
        tokens.push(AssemblyToken::Op(evm_mnemonic(data.opcode)));
        for _ in 0..data.operands.len() {
            stack.pop();
        }
        for &r in &data.results {
            stack.push(r);
        }
        Ok(())
    }

    /// A call site: push the continuation label (the value our tracked
    /// [`return_addr_var`] stands in for), then the arguments in
    /// declaration order so the last one ends up topmost — matching the
    /// callee's own entry convention of `[retaddr, param0, .., paramN-1]`
    /// with `paramN-1` on top — then jump.
    fn schedule_invoke(&mut self, inst: Inst, data: &InstructionData, block: Block, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        let callee = data.operands[0].as_label().expect("invoke operand 0 is the callee label").clone();
        let continuation = self.fresh_label("cont");

        tokens.push(AssemblyToken::LabelRef(continuation.clone()));
        for operand in &data.operands[1..] {
            match operand {
                Operand::Var(v) => {
                    let keep = self.liveness.is_live_after(inst, *v) || self.liveness.is_live_out(block, *v);
                    self.materialize(inst, *v, keep, stack, tokens)?;
                }
                Operand::Literal(lit) => tokens.push(AssemblyToken::Push(lit.0)),
                Operand::Label(l) => tokens.push(AssemblyToken::LabelRef(l.clone())),
            }
        }
        tokens.push(AssemblyToken::LabelRef(callee));
        tokens.push(AssemblyToken::Op("JUMP"));

        for _ in 0..data.operands.len() - 1 {
            stack.pop();
        }
        tokens.push(AssemblyToken::LabelDef(continuation));
        tokens.push(AssemblyToken::Op("JUMPDEST"));
        for &r in &data.results {
            stack.push(r);
        }
        Ok(())
    }

    fn schedule_terminator(&mut self, inst: Inst, block: Block, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        let data = self.func.dfg.inst_data(inst).clone();
        match data.opcode {
            Opcode::Jmp => {
                let target_label = data.operands[0].as_label().expect("jmp operand is a label").clone();
                let target = self.func.block_by_label(&target_label).expect("jmp targets a real block");
                self.prepare_edge(inst, target, stack, tokens)?;
                tokens.push(AssemblyToken::LabelRef(target_label));
                tokens.push(AssemblyToken::Op("JUMP"));
            }
            Opcode::Jnz => {
                let cond = data.operands[0].as_var().expect("jnz operand 0 is a var");
                let true_label = data.operands[1].as_label().expect("jnz operand 1 is a label").clone();
                let false_label = data.operands[2].as_label().expect("jnz operand 2 is a label").clone();
                let true_target = self.func.block_by_label(&true_label).expect("jnz true target exists");
                let false_target = self.func.block_by_label(&false_label).expect("jnz false target exists");

                // Both successors must see the same residual layout after
                // `JUMPI` pops the condition: whichever side's entry layout
                // is recorded first (here, always the true side) is what the
                // false side must already match, since there's no code on
                // the untaken path to insert a fixup into.
                self.prepare_edge(inst, true_target, stack, tokens)?;
                self.reconcile_entry(false_target, stack);

                self.materialize(inst, cond, false, stack, tokens)?;
                tokens.push(AssemblyToken::LabelRef(true_label));
                tokens.push(AssemblyToken::Op("JUMPI"));
                tokens.push(AssemblyToken::LabelRef(false_label));
                tokens.push(AssemblyToken::Op("JUMP"));
            }
            Opcode::Djmp => {
                let target = data.operands[0].as_var().expect("djmp operand 0 is a var holding an address");
                self.materialize(inst, target, false, stack, tokens)?;
                tokens.push(AssemblyToken::Op("JUMP"));
            }
            Opcode::Ret => {
                // Return values push in declaration order, last on top —
                // the call-boundary convention `schedule_invoke` assumes
                // when it tracks a callee's results afterward.
                for operand in &data.operands {
                    let v = operand.as_var().expect("ret operands are return values");
                    self.materialize(inst, v, false, stack, tokens)?;
                }
                self.materialize(inst, return_addr_var(), false, stack, tokens)?;
                tokens.push(AssemblyToken::Op("JUMP"));
            }
            Opcode::Return | Opcode::Revert => {
                for operand in data.operands.iter().rev() {
                    let v = operand.as_var().expect("return/revert operands are memory offset and length");
                    self.materialize(inst, v, false, stack, tokens)?;
                }
                tokens.push(AssemblyToken::Op(evm_mnemonic(data.opcode)));
            }
            Opcode::Stop | Opcode::Selfdestruct | Opcode::Invalid | Opcode::AssertUnreachable => {
                tokens.push(AssemblyToken::Op(evm_mnemonic(data.opcode)));
            }
            other => unreachable!("{other:?} is not a terminator opcode"),
        }
        Ok(())
    }

    /// Prune the exit stack down to exactly `target`'s live-in set, then
    /// commit to (first visit) or permute to (later visit, typically a loop
    /// back-edge) that block's canonical entry order — the "shuffle at the
    /// predecessor" a merge point with disagreeing incoming layouts calls
    /// for.
    fn prepare_edge(&mut self, inst: Inst, target: Block, stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        let required: Vec<Var> = self.liveness.live_in(target).collect();
        loop {
            let Some(extra_pos) = stack.as_slice().iter().rev().position(|v| !required.contains(v)) else { break };
            if extra_pos >= MAX_STACK_REACH {
                return Err(SchedulerError::StackTooDeep(inst));
            }
            stack.swap_to_depth(extra_pos, tokens);
            stack.pop_emit(tokens);
        }
        if let Some(order) = self.entry_stack.get(&target).cloned() {
            self.permute_to(inst, &order, stack, tokens)?;
        } else {
            self.entry_stack.insert(target, stack.as_slice().to_vec());
        }
        Ok(())
    }

    /// Record `target`'s canonical entry order on a first visit; a no-op on
    /// later visits (used for `jnz`'s untaken side, which a real edge never
    /// gets a chance to emit shuffle tokens for).
    fn reconcile_entry(&mut self, target: Block, stack: &SymbolicStack) {
        self.entry_stack.entry(target).or_insert_with(|| stack.as_slice().to_vec());
    }

    /// Permute `stack`, which already holds exactly the vars in `order` (as
    /// a set), into that same order top-to-bottom, via a sequence of swaps.
    fn permute_to(&self, inst: Inst, order: &[Var], stack: &mut SymbolicStack, tokens: &mut Vec<AssemblyToken>) -> Result<(), SchedulerError> {
        for &want in order.iter().rev() {
            let depth = stack.position_from_top(want).expect("permute_to target var missing from stack");
            if depth >= MAX_STACK_REACH {
                return Err(SchedulerError::StackTooDeep(inst));
            }
            stack.swap_to_depth(depth, tokens);
            stack.pop();
            stack.push(want);
        }
        Ok(())
    }
}

fn evm_mnemonic(opcode: Opcode) -> &'static str {
    use Opcode::*;
    match opcode {
        Add => "ADD", Sub => "SUB", Mul => "MUL", Div => "DIV", Sdiv => "SDIV",
        Mod => "MOD", Smod => "SMOD", Addmod => "ADDMOD", Mulmod => "MULMOD",
        Exp => "EXP", Signextend => "SIGNEXTEND",
        Lt => "LT", Gt => "GT", Slt => "SLT", Sgt => "SGT", Eq => "EQ", Iszero => "ISZERO",
        And => "AND", Or => "OR", Xor => "XOR", Not => "NOT",
        Shl => "SHL", Shr => "SHR", Sar => "SAR", Byte => "BYTE",
        Sha3 | Sha3_64 => "SHA3",
        Address => "ADDRESS", Balance => "BALANCE", Origin => "ORIGIN", Caller => "CALLER",
        Callvalue => "CALLVALUE", Calldataload => "CALLDATALOAD", Calldatasize => "CALLDATASIZE",
        Calldatacopy => "CALLDATACOPY", Codesize => "CODESIZE", Codecopy => "CODECOPY",
        Gasprice => "GASPRICE", Extcodesize => "EXTCODESIZE", Extcodecopy => "EXTCODECOPY",
        Returndatasize => "RETURNDATASIZE", Returndatacopy => "RETURNDATACOPY",
        Extcodehash => "EXTCODEHASH", Selfbalance => "SELFBALANCE",
        Blockhash => "BLOCKHASH", Coinbase => "COINBASE", Timestamp => "TIMESTAMP",
        Number => "NUMBER", Prevrandao => "PREVRANDAO", Gaslimit => "GASLIMIT",
        Chainid => "CHAINID", Basefee => "BASEFEE", Blobbasefee => "BLOBBASEFEE",
        Pop => "POP", Mload => "MLOAD", Mstore => "MSTORE", Mstore8 => "MSTORE8",
        Mcopy => "MCOPY", Sload => "SLOAD", Sstore => "SSTORE", Tload => "TLOAD",
        Tstore => "TSTORE", Msize => "MSIZE", Gas => "GAS",
        Call => "CALL", Staticcall => "STATICCALL", Delegatecall => "DELEGATECALL",
        Create => "CREATE", Create2 => "CREATE2",
        Return => "RETURN", Revert => "REVERT", Stop => "STOP", Selfdestruct => "SELFDESTRUCT",
        Invalid | AssertUnreachable => "INVALID",
        Log0 => "LOG0", Log1 => "LOG1", Log2 => "LOG2", Log3 => "LOG3", Log4 => "LOG4",
        Dload => "MLOAD",
        other => unreachable!("{other:?} is lowered specially and never reaches evm_mnemonic"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Literal, Operand};
    use smallvec::smallvec;

    #[test]
    fn schedules_a_straight_line_add_and_return() {
        let mut func = Function::new(Label::new("f"));
        func.is_entry = true;
        let entry = func.dfg.make_block();
        func.layout.append_block(entry);
        func.dfg.set_block_label(entry, Label::new("entry"));

        let a = func.dfg.make_var();
        let load_a = func.dfg.make_inst(InstructionData::new(
            Opcode::Calldataload,
            smallvec![Operand::Literal(Literal::from_u64(0))],
            smallvec![a],
        ));
        func.layout.append_inst(load_a, entry);

        let sum = func.dfg.make_var();
        let add = func.dfg.make_inst(InstructionData::new(
            Opcode::Add,
            smallvec![Operand::Var(a), Operand::Literal(Literal::from_u64(1))],
            smallvec![sum],
        ));
        func.layout.append_inst(add, entry);

        let offset = func.dfg.make_var();
        let off_inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(0))],
            smallvec![offset],
        ));
        func.layout.append_inst(off_inst, entry);
        let store = func.dfg.make_inst(InstructionData::new(
            Opcode::Mstore,
            smallvec![Operand::Var(offset), Operand::Var(sum)],
            Default::default(),
        ));
        func.layout.append_inst(store, entry);

        let ret_offset = func.dfg.make_var();
        let ret_off_inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(0))],
            smallvec![ret_offset],
        ));
        func.layout.append_inst(ret_off_inst, entry);
        let ret_len = func.dfg.make_var();
        let ret_len_inst = func.dfg.make_inst(InstructionData::new(
            Opcode::Assign,
            smallvec![Operand::Literal(Literal::from_u64(32))],
            smallvec![ret_len],
        ));
        func.layout.append_inst(ret_len_inst, entry);
        let ret = func.dfg.make_inst(InstructionData::new(
            Opcode::Return,
            smallvec![Operand::Var(ret_offset), Operand::Var(ret_len)],
            Default::default(),
        ));
        func.layout.append_inst(ret, entry);

        let mut allocator = MemAllocator::new();
        let tokens = schedule_function(&func, &mut allocator).expect("schedules cleanly");
        assert!(tokens.contains(&AssemblyToken::Op("ADD")));
        assert!(tokens.contains(&AssemblyToken::Op("MSTORE")));
        assert!(tokens.contains(&AssemblyToken::Op("RETURN")));
        assert_eq!(tokens.first(), Some(&AssemblyToken::LabelDef(Label::new("entry"))));
    }

    #[test]
    fn jmp_prunes_dead_values_before_the_edge() {
        let mut func = Function::new(Label::new("f"));
        func.is_entry = true;
        let entry = func.dfg.make_block();
        let next = func.dfg.make_block();
        func.layout.append_block(entry);
        func.layout.append_block(next);
        func.dfg.set_block_label(entry, Label::new("entry"));
        func.dfg.set_block_label(next, Label::new("next"));

        let dead = func.dfg.make_var();
        let dead_inst = func.dfg.make_inst(InstructionData::new(Opcode::Gas, Default::default(), smallvec![dead]));
        func.layout.append_inst(dead_inst, entry);
        let jmp = func.dfg.make_inst(InstructionData::new(
            Opcode::Jmp,
            smallvec![Operand::Label(Label::new("next"))],
            Default::default(),
        ));
        func.layout.append_inst(jmp, entry);
        let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop, next);

        let mut allocator = MemAllocator::new();
        let tokens = schedule_function(&func, &mut allocator).expect("schedules cleanly");
        assert!(tokens.contains(&AssemblyToken::Op("POP")));
    }
}
