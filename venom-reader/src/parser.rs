//! Recursive-descent parser for the textual IR format (spec module C2).
//!
//! Variable names in the source text (`%7`, `%acc`, whatever the writer
//! chose) are symbols, not binding indices: [`Symbols`] maps each name to
//! the real [`Var`] the first mention of it allocates, so a var can be used
//! before its defining instruction appears in program order (a loop-header
//! phi referencing its back-edge value, for instance) without the parser
//! needing a second pass.
//!
//! Per the spec's error-handling design, a malformed input never produces a
//! partial [`Context`]: every syntax error found is collected into the same
//! [`ErrorGroup`] the post-parse structural checker reports through, parsing
//! resumes at the next likely statement boundary to surface more than one
//! error per run, and [`parse`] returns `Err` if the group ends up
//! non-empty.

use rustc_hash::FxHashMap;
use smallvec::smallvec;
use venom::ir::{Context, DataFlowGraph, DataItem, Function, InstructionData, Label, Literal, Opcode, Operand, OperandList, ResultList, Var, Word};
use venom::result::ErrorGroup;

use crate::error::ReadError;
use crate::lexer::{Lexer, Span, Token};

pub fn parse(src: &str) -> Result<Context, ErrorGroup> {
    let tokens = match Lexer::new(src).tokenize() {
        Ok(t) => t,
        Err(e) => {
            let mut errors = ErrorGroup::new();
            errors.push(ReadError::from(e).into());
            return Err(errors);
        }
    };

    let mut parser = Parser { tokens, pos: 0 };
    let mut ctx = Context::new();
    let mut errors = ErrorGroup::new();

    parser.skip_semis();
    while !parser.check(&Token::Eof) {
        if let Err(e) = parser.parse_top_level_item(&mut ctx) {
            errors.push(e.into());
            parser.recover();
        }
        parser.skip_semis();
    }

    if errors.is_empty() {
        log::trace!("parsed {} function(s)", ctx.function_ids().count());
        Ok(ctx)
    } else {
        log::debug!("parse failed with {} error(s)", errors.errors().len());
        Err(errors)
    }
}

/// Name -> [`Var`] bindings for the function currently being parsed. Scoped
/// per function: variable names are not shared across functions.
struct Symbols {
    vars: FxHashMap<String, Var>,
}

impl Symbols {
    fn new() -> Self {
        Symbols { vars: FxHashMap::default() }
    }

    fn resolve(&mut self, name: String, dfg: &mut DataFlowGraph) -> Var {
        *self.vars.entry(name).or_insert_with(|| dfg.make_var())
    }
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn check(&self, t: &Token) -> bool {
        self.cur() == t
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.check(t) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Token) -> Result<(), ReadError> {
        if self.eat(&t) {
            Ok(())
        } else {
            Err(ReadError::at(self.span(), t.to_string(), self.cur().to_string()))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<(), ReadError> {
        match self.cur() {
            Token::Ident(s) if s == word => {
                self.bump();
                Ok(())
            }
            other => Err(ReadError::at(self.span(), format!("`{word}`"), other.to_string())),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ReadError> {
        match self.cur().clone() {
            Token::Ident(s) => {
                self.bump();
                Ok(s)
            }
            other => Err(ReadError::at(self.span(), "an identifier", other.to_string())),
        }
    }

    fn expect_var(&mut self) -> Result<String, ReadError> {
        match self.cur().clone() {
            Token::Var(s) => {
                self.bump();
                Ok(s)
            }
            other => Err(ReadError::at(self.span(), "a variable (%name)", other.to_string())),
        }
    }

    fn expect_int(&mut self) -> Result<Word, ReadError> {
        match self.cur().clone() {
            Token::Int(v) => {
                self.bump();
                Ok(v)
            }
            other => Err(ReadError::at(self.span(), "an integer literal", other.to_string())),
        }
    }

    fn expect_hex_string(&mut self) -> Result<Vec<u8>, ReadError> {
        match self.cur().clone() {
            Token::HexString(b) => {
                self.bump();
                Ok(b)
            }
            other => Err(ReadError::at(self.span(), "a quoted hex string", other.to_string())),
        }
    }

    fn peek_keyword(&self) -> Option<&str> {
        match self.cur() {
            Token::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn skip_semis(&mut self) {
        while self.check(&Token::Semi) {
            self.bump();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.cur(), Token::Semi | Token::RBrace | Token::Eof)
    }

    fn at_block_header_or_end(&self) -> bool {
        if matches!(self.cur(), Token::RBrace | Token::Eof) {
            return true;
        }
        matches!(self.cur(), Token::Ident(_)) && matches!(self.tokens.get(self.pos + 1).map(|(t, _)| t), Some(Token::Colon))
    }

    /// Skip forward to the next token a new statement could plausibly start
    /// at, so one syntax error doesn't swallow the rest of the file.
    fn recover(&mut self) {
        loop {
            match self.cur() {
                Token::Eof | Token::RBrace => return,
                Token::Semi => {
                    self.bump();
                    return;
                }
                Token::Ident(s) if matches!(s.as_str(), "function" | "entry" | "data" | "const") => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_top_level_item(&mut self, ctx: &mut Context) -> Result<(), ReadError> {
        match self.peek_keyword() {
            Some("entry") => {
                self.bump();
                self.parse_function(ctx, true)
            }
            Some("function") => self.parse_function(ctx, false),
            Some("data") => self.parse_data_section(ctx),
            Some("const") => self.parse_constant(ctx),
            _ => Err(ReadError::at(self.span(), "`function`, `entry function`, `data`, or `const`", self.cur().to_string())),
        }
    }

    fn parse_function(&mut self, ctx: &mut Context, is_entry: bool) -> Result<(), ReadError> {
        self.expect_keyword("function")?;
        let name = self.expect_ident()?;
        let mut func = Function::new(name);
        func.is_entry = is_entry;

        let mut param_names = Vec::new();
        if self.eat(&Token::LParen) {
            if !self.check(&Token::RParen) {
                loop {
                    param_names.push(self.expect_var()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(Token::RParen)?;
        }

        self.expect(Token::LBrace)?;
        self.skip_semis();

        let mut symbols = Symbols::new();
        let mut seen_labels: FxHashMap<String, ()> = FxHashMap::default();
        let mut first_block = true;
        while !self.check(&Token::RBrace) {
            self.parse_block(&mut func, &mut symbols, &mut seen_labels, first_block, &param_names)?;
            first_block = false;
            self.skip_semis();
        }
        self.expect(Token::RBrace)?;

        ctx.add_function(func);
        Ok(())
    }

    fn parse_block(
        &mut self,
        func: &mut Function,
        symbols: &mut Symbols,
        seen_labels: &mut FxHashMap<String, ()>,
        is_entry_block: bool,
        param_names: &[String],
    ) -> Result<(), ReadError> {
        let label_span = self.span();
        let label_name = self.expect_ident()?;
        self.expect(Token::Colon)?;
        if seen_labels.insert(label_name.clone(), ()).is_some() {
            return Err(ReadError::DuplicateBlock {
                line: label_span.line,
                col: label_span.col,
                label: label_name,
                func: func.name.to_string(),
            });
        }

        let block = func.dfg.make_block();
        func.layout.append_block(block);
        func.dfg.set_block_label(block, Label::new(label_name));

        if is_entry_block {
            for pname in param_names {
                let var = func.dfg.append_block_param(block);
                symbols.vars.insert(pname.clone(), var);
                func.params.push(var);
            }
        }

        self.skip_semis();
        while !self.at_block_header_or_end() {
            let inst = self.parse_instruction(func, symbols)?;
            func.layout.append_inst(inst, block);
            self.skip_semis();
        }
        Ok(())
    }

    fn parse_instruction(&mut self, func: &mut Function, symbols: &mut Symbols) -> Result<venom::ir::Inst, ReadError> {
        let mut results: ResultList = smallvec![];
        if matches!(self.cur(), Token::Var(_)) {
            loop {
                let name = self.expect_var()?;
                results.push(symbols.resolve(name, &mut func.dfg));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::Equals)?;
        }

        let op_span = self.span();
        let op_name = self.expect_ident()?;
        let opcode = Opcode::from_name(&op_name).ok_or_else(|| ReadError::UnknownOpcode { line: op_span.line, col: op_span.col, name: op_name })?;

        let mut operands: OperandList = smallvec![];
        if !self.at_statement_end() {
            loop {
                operands.push(self.parse_operand(func, symbols)?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        Ok(func.dfg.make_inst(InstructionData::new(opcode, operands, results)))
    }

    fn parse_operand(&mut self, func: &mut Function, symbols: &mut Symbols) -> Result<Operand, ReadError> {
        match self.cur().clone() {
            Token::Var(name) => {
                self.bump();
                Ok(Operand::Var(symbols.resolve(name, &mut func.dfg)))
            }
            Token::Int(v) => {
                self.bump();
                Ok(Operand::Literal(Literal(v)))
            }
            Token::At => {
                self.bump();
                let name = self.expect_ident()?;
                Ok(Operand::Label(Label::new(name)))
            }
            other => Err(ReadError::at(self.span(), "a variable, integer, or @label", other.to_string())),
        }
    }

    fn parse_data_section(&mut self, ctx: &mut Context) -> Result<(), ReadError> {
        self.expect_keyword("data")?;
        let name = self.expect_ident()?;
        ctx.append_data_section(Label::new(name));
        self.expect(Token::LBrace)?;
        self.skip_semis();
        while !self.check(&Token::RBrace) {
            let kind_span = self.span();
            let kind = self.expect_ident()?;
            match kind.as_str() {
                "bytes" => {
                    let bytes = self.expect_hex_string()?;
                    ctx.append_data_item(DataItem::Bytes(bytes));
                }
                "label" => {
                    self.expect(Token::At)?;
                    let target = self.expect_ident()?;
                    ctx.append_data_item(DataItem::LabelRef(Label::new(target)));
                }
                other => {
                    return Err(ReadError::at(kind_span, "`bytes` or `label`", format!("`{other}`")));
                }
            }
            self.skip_semis();
        }
        self.expect(Token::RBrace)?;
        Ok(())
    }

    fn parse_constant(&mut self, ctx: &mut Context) -> Result<(), ReadError> {
        self.expect_keyword("const")?;
        let name = self.expect_ident()?;
        self.expect(Token::Equals)?;
        let value = self.expect_int()?;
        ctx.add_constant(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_straight_line_function() {
        let src = "entry function f(%0) {\n  bb0:\n    %1 = add %0, 5\n    return %1, 32\n}\n";
        let ctx = parse(src).expect("parses cleanly");
        let fid = ctx.entry_function().expect("has an entry function");
        let func = ctx.function(fid);
        assert_eq!(func.name.as_str(), "f");
        assert_eq!(func.params.len(), 1);
        assert_eq!(func.num_blocks(), 1);
    }

    #[test]
    fn unknown_opcode_is_collected_not_thrown_immediately() {
        let src = "function f {\n  bb0:\n    %0 = bogus 1\n    stop\n}\nfunction g {\n  bb0:\n    %0 = also_bogus 2\n    stop\n}\n";
        let err = parse(src).unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn phi_operand_names_resolve_through_the_symbol_table() {
        let src = "entry function f {\n  bb0:\n    %x = phi @bb0, %y\n    jmp @bb0\n}\n";
        let ctx = parse(src).expect("parses cleanly");
        let fid = ctx.entry_function().unwrap();
        let func = ctx.function(fid);
        let entry = func.entry_block().unwrap();
        let phi = func.layout.block_insts(entry).next().unwrap();
        let data = func.dfg.inst_data(phi);
        let result = data.result().unwrap();
        let (_, y) = data.phi_args().next().unwrap();
        assert_ne!(result, y, "phi's own result and its incoming value must be distinct variables");
    }
}
