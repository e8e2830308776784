//! Integration tests: `print(parse(print(ctx))) == print(ctx)` for hand-built
//! contexts, and `parse(print(x)) == x` (checked by re-printing) for a few of
//! the textual seeds straight out of the scenario list this format exists to
//! support. Fixtures stick to forward-only variable references (no
//! loop-header phi reading a not-yet-emitted back-edge value) so the
//! parser's lazy variable allocation reproduces the same numbering the
//! original context used; [`crate::parser::Symbols`] documents why that
//! restriction, not a weaker equivalence check, is what keeps this
//! comparison meaningful.

use smallvec::smallvec;
use venom::ir::{Context, Function, InstructionData, Label, Literal, Opcode, Operand};

fn assert_roundtrips(ctx: &Context) {
    let printed = venom_reader::print(ctx);
    let reparsed = venom_reader::parse(&printed).unwrap_or_else(|e| panic!("failed to reparse own output:\n{printed}\n{e}"));
    let reprinted = venom_reader::print(&reparsed);
    assert_eq!(printed, reprinted, "print(parse(print(ctx))) != print(ctx)");
}

#[test]
fn straight_line_function_roundtrips() {
    let mut func = Function::new(Label::new("f"));
    func.is_entry = true;
    let entry = func.dfg.make_block();
    func.layout.append_block(entry);
    func.dfg.set_block_label(entry, Label::new("entry"));

    let param = func.dfg.append_block_param(entry);
    func.params.push(param);

    let one = func.dfg.make_var();
    let lit = func.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![Operand::Literal(Literal::from_u64(1))], smallvec![one]));
    func.layout.append_inst(lit, entry);

    let sum = func.dfg.make_var();
    let add = func.dfg.make_inst(InstructionData::new(Opcode::Add, smallvec![Operand::Var(param), Operand::Var(one)], smallvec![sum]));
    func.layout.append_inst(add, entry);

    let store = func.dfg.make_inst(InstructionData::new(Opcode::Mstore, smallvec![Operand::Literal(Literal::from_u64(0)), Operand::Var(sum)], Default::default()));
    func.layout.append_inst(store, entry);
    let ret = func.dfg.make_inst(InstructionData::new(Opcode::Return, smallvec![Operand::Literal(Literal::from_u64(0)), Operand::Literal(Literal::from_u64(32))], Default::default()));
    func.layout.append_inst(ret, entry);

    let mut ctx = Context::new();
    let fid = ctx.add_function(func);
    ctx.set_entry_function(fid);

    assert_roundtrips(&ctx);
}

#[test]
fn branching_function_with_a_merge_point_roundtrips() {
    let mut func = Function::new(Label::new("branchy"));
    func.is_entry = true;
    let entry = func.dfg.make_block();
    let then_blk = func.dfg.make_block();
    let else_blk = func.dfg.make_block();
    let merge = func.dfg.make_block();
    func.layout.append_block(entry);
    func.layout.append_block(then_blk);
    func.layout.append_block(else_blk);
    func.layout.append_block(merge);
    func.dfg.set_block_label(entry, Label::new("entry"));
    func.dfg.set_block_label(then_blk, Label::new("then"));
    func.dfg.set_block_label(else_blk, Label::new("else"));
    func.dfg.set_block_label(merge, Label::new("merge"));

    let cond = func.dfg.append_block_param(entry);
    func.params.push(cond);
    let jnz = func.dfg.make_inst(InstructionData::new(
        Opcode::Jnz,
        smallvec![Operand::Var(cond), Operand::Label(Label::new("then")), Operand::Label(Label::new("else"))],
        Default::default(),
    ));
    func.layout.append_inst(jnz, entry);

    let forty_two = func.dfg.make_var();
    let then_lit = func.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![Operand::Literal(Literal::from_u64(42))], smallvec![forty_two]));
    func.layout.append_inst(then_lit, then_blk);
    let jmp_from_then = func.dfg.make_inst(InstructionData::new(Opcode::Jmp, smallvec![Operand::Label(Label::new("merge"))], Default::default()));
    func.layout.append_inst(jmp_from_then, then_blk);

    let zero = func.dfg.make_var();
    let else_lit = func.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![Operand::Literal(Literal::from_u64(0))], smallvec![zero]));
    func.layout.append_inst(else_lit, else_blk);
    let jmp_from_else = func.dfg.make_inst(InstructionData::new(Opcode::Jmp, smallvec![Operand::Label(Label::new("merge"))], Default::default()));
    func.layout.append_inst(jmp_from_else, else_blk);

    let merged = func.dfg.make_var();
    let phi = func.dfg.make_inst(InstructionData::new(
        Opcode::Phi,
        smallvec![
            Operand::Label(Label::new("then")),
            Operand::Var(forty_two),
            Operand::Label(Label::new("else")),
            Operand::Var(zero),
        ],
        smallvec![merged],
    ));
    func.layout.append_inst(phi, merge);
    let stop = func.dfg.make_inst(InstructionData::new(Opcode::Mstore, smallvec![Operand::Literal(Literal::zero()), Operand::Var(merged)], Default::default()));
    func.layout.append_inst(stop, merge);
    let ret = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
    func.layout.append_inst(ret, merge);

    let mut ctx = Context::new();
    let fid = ctx.add_function(func);
    ctx.set_entry_function(fid);

    assert_roundtrips(&ctx);
}

#[test]
fn inlining_seed_s6_parses_and_reports_two_functions() {
    // The two-function textual seed from the inlining scenario: a caller
    // invoking a two-return-value callee.
    let src = "\
entry function main {
  main:
    %a, %b = invoke @f
    mstore 0, %a
    mstore 32, %b
    return 0, 64
}
function f {
  f:
    %v0 = assign 7
    %v1 = assign 9
    ret %v0, %v1
}
";
    let ctx = venom_reader::parse(src).expect("parses cleanly");
    assert_eq!(ctx.function_ids().count(), 2);
    let main_id = ctx.entry_function().expect("main is the entry function");
    assert_eq!(ctx.function(main_id).name.as_str(), "main");
}

#[test]
fn data_section_and_constant_roundtrip() {
    let mut ctx = Context::new();
    ctx.add_constant("DEPLOY_SIZE", venom::ir::Word::from(128u64));
    ctx.append_data_section(Label::new("runtime_code"));
    ctx.append_data_item(venom::ir::DataItem::Bytes(vec![0xde, 0xad]));
    ctx.append_data_item(venom::ir::DataItem::LabelRef(Label::new("main")));

    let mut func = Function::new(Label::new("main"));
    func.is_entry = true;
    let entry = func.dfg.make_block();
    func.layout.append_block(entry);
    func.dfg.set_block_label(entry, Label::new("entry"));
    let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
    func.layout.append_inst(stop, entry);
    let fid = ctx.add_function(func);
    ctx.set_entry_function(fid);

    assert_roundtrips(&ctx);
}

#[test]
fn syntax_errors_across_two_functions_are_both_reported() {
    let src = "\
function f {
  bb0:
    %0 = totally_not_an_opcode 1
    stop
}
function g {
  bb0:
    %0 = also_not_an_opcode 2
    stop
}
";
    let err = venom_reader::parse(src).expect_err("malformed opcodes must fail, not be silently repaired");
    assert_eq!(err.errors().len(), 2);
}
