//! Pretty-printer for [`venom::ir::Context`] (spec module C2): the inverse of
//! [`crate::parser::parse`]. Each function prints entry function first, then
//! the rest in definition order, mirroring how [`venom::scheduler::schedule_context`]
//! orders its own output so a diff between the two is meaningful.

use venom::entity::EntityRef;
use venom::ir::{Block, Context, DataItem, Function, Inst, Label, Operand};

pub fn print(ctx: &Context) -> String {
    let mut out = String::new();

    for (name, value) in &ctx.constants {
        out.push_str(&format!("const {name} = {value}\n"));
    }
    if !ctx.constants.is_empty() {
        out.push('\n');
    }

    for section in &ctx.data_sections {
        out.push_str(&format!("data {} {{\n", section.name));
        for item in &section.items {
            match item {
                DataItem::Bytes(bytes) => out.push_str(&format!("    bytes \"{}\"\n", to_hex(bytes))),
                DataItem::LabelRef(label) => out.push_str(&format!("    label @{label}\n")),
            }
        }
        out.push_str("}\n\n");
    }

    let mut order: Vec<_> = ctx.entry_function().into_iter().collect();
    order.extend(ctx.function_ids().filter(|&id| Some(id) != ctx.entry_function()));
    for fid in order {
        print_function(&mut out, ctx.function(fid));
    }

    out
}

fn print_function(out: &mut String, func: &Function) {
    if func.is_entry {
        out.push_str("entry ");
    }
    out.push_str("function ");
    out.push_str(func.name.as_str());
    if !func.params.is_empty() {
        out.push('(');
        for (i, p) in func.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&p.to_string());
        }
        out.push(')');
    }
    out.push_str(" {\n");
    for block in func.blocks() {
        print_block(out, func, block);
    }
    out.push_str("}\n\n");
}

fn print_block(out: &mut String, func: &Function, block: Block) {
    let label = block_label_or_synthetic(func, block);
    out.push_str(&format!("  {label}:\n"));
    for inst in func.layout.block_insts(block) {
        print_instruction(out, func, inst);
    }
}

fn block_label_or_synthetic(func: &Function, block: Block) -> Label {
    func.dfg.block_label(block).cloned().unwrap_or_else(|| Label::new(format!("bb{}", block.index())))
}

fn print_instruction(out: &mut String, func: &Function, inst: Inst) {
    out.push_str("    ");
    let data = func.dfg.inst_data(inst);
    if !data.results.is_empty() {
        for (i, r) in data.results.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&r.to_string());
        }
        out.push_str(" = ");
    }
    out.push_str(data.opcode.name());
    if !data.operands.is_empty() {
        out.push(' ');
        for (i, operand) in data.operands.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            print_operand(out, operand);
        }
    }
    out.push('\n');
}

fn print_operand(out: &mut String, operand: &Operand) {
    match operand {
        Operand::Var(v) => out.push_str(&v.to_string()),
        Operand::Literal(l) => out.push_str(&l.to_string()),
        Operand::Label(l) => out.push_str(&format!("@{l}")),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use venom::ir::{InstructionData, Label as L, Literal, Opcode};
    use smallvec::smallvec;

    #[test]
    fn prints_a_minimal_function() {
        let mut func = Function::new(L::new("f"));
        func.is_entry = true;
        let entry = func.dfg.make_block();
        func.layout.append_block(entry);
        func.dfg.set_block_label(entry, L::new("entry"));
        let v = func.dfg.make_var();
        let assign = func.dfg.make_inst(InstructionData::new(Opcode::Assign, smallvec![Operand::Literal(Literal::from_u64(7))], smallvec![v]));
        func.layout.append_inst(assign, entry);
        let stop = func.dfg.make_inst(InstructionData::nullary(Opcode::Stop, None));
        func.layout.append_inst(stop, entry);

        let mut ctx = Context::new();
        let fid = ctx.add_function(func);
        ctx.set_entry_function(fid);

        let text = print(&ctx);
        assert!(text.contains("entry function f {"));
        assert!(text.contains("entry:"));
        assert!(text.contains("= assign 7"));
        assert!(text.contains("stop"));
    }
}
