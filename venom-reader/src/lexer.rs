//! Tokenizer for the textual IR format (spec module C2).
//!
//! The format has no statement keyword, so instruction boundaries are
//! whitespace-significant: a newline or `;` ends the current instruction,
//! same as a line in the round-trip examples the format exists to support.
//! Everything else (braces, colons, commas, `@`, `=`) is ordinary punctuation.

use std::fmt;

use alloy_primitives::U256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    /// `%123` — the textual spelling of a [`venom::ir::Var`]'s name. Kept as
    /// a string rather than a parsed index: the parser treats it as a
    /// symbol name, not a binding numeric index (see `parser::Symbols`).
    Var(String),
    Int(U256),
    /// A quoted hex blob, e.g. `"deadbeef"`, used for raw data-section bytes.
    HexString(Vec<u8>),
    At,
    Comma,
    Colon,
    Equals,
    LParen,
    RParen,
    LBrace,
    RBrace,
    /// End of one instruction/statement: a newline or `;`. Consecutive
    /// terminators collapse into one token.
    Semi,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::Var(s) => write!(f, "%{s}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::HexString(_) => write!(f, "<hex string>"),
            Token::At => write!(f, "@"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Equals => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semi => write!(f, "<end of statement>"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("{0}:{1}: unexpected character {2:?}")]
    UnexpectedChar(u32, u32, char),
    #[error("{0}:{1}: unterminated string literal")]
    UnterminatedString(u32, u32),
    #[error("{0}:{1}: invalid hex digit in string literal")]
    InvalidHex(u32, u32),
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src: src.as_bytes(), pos: 0, line: 1, col: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span { line: self.line, col: self.col }
    }

    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, LexError> {
        let mut out = Vec::new();
        loop {
            self.skip_insignificant_whitespace_and_comments();
            let span = self.span();
            let Some(c) = self.peek() else {
                out.push((Token::Eof, span));
                return Ok(out);
            };
            let tok = match c {
                b'\n' | b';' => {
                    while matches!(self.peek(), Some(b'\n') | Some(b';')) {
                        self.bump();
                        self.skip_insignificant_whitespace_and_comments();
                    }
                    Token::Semi
                }
                b'@' => {
                    self.bump();
                    Token::At
                }
                b',' => {
                    self.bump();
                    Token::Comma
                }
                b':' => {
                    self.bump();
                    Token::Colon
                }
                b'=' => {
                    self.bump();
                    Token::Equals
                }
                b'(' => {
                    self.bump();
                    Token::LParen
                }
                b')' => {
                    self.bump();
                    Token::RParen
                }
                b'{' => {
                    self.bump();
                    Token::LBrace
                }
                b'}' => {
                    self.bump();
                    Token::RBrace
                }
                b'"' => self.lex_hex_string()?,
                b'%' => self.lex_var(),
                b'-' | b'0'..=b'9' => self.lex_number(),
                c if is_ident_start(c) => self.lex_ident(),
                other => return Err(LexError::UnexpectedChar(span.line, span.col, other as char)),
            };
            out.push((tok, span));
        }
    }

    fn skip_insignificant_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                }
                Some(b'#') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_var(&mut self) -> Token {
        self.bump(); // '%'
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                name.push(c as char);
                self.bump();
            } else {
                break;
            }
        }
        Token::Var(name)
    }

    fn lex_ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                name.push(c as char);
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }

    fn lex_number(&mut self) -> Token {
        let mut text = String::new();
        if self.peek() == Some(b'-') {
            text.push('-');
            self.bump();
        }
        if self.peek() == Some(b'0') && self.peek2() == Some(b'x') {
            text.push('0');
            text.push('x');
            self.bump();
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                text.push(self.bump().unwrap() as char);
            }
            let v = U256::from_str_radix(text.trim_start_matches("0x"), 16).unwrap_or(U256::ZERO);
            return Token::Int(v);
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap() as char);
        }
        if let Some(rest) = text.strip_prefix('-') {
            // Negative literals are stored as their EVM two's-complement
            // value: the printer never emits them, but the parser accepts
            // them for hand-written test fixtures.
            let magnitude = U256::from_str_radix(rest, 10).unwrap_or(U256::ZERO);
            return Token::Int(U256::ZERO.wrapping_sub(magnitude));
        }
        Token::Int(U256::from_str_radix(&text, 10).unwrap_or(U256::ZERO))
    }

    fn lex_hex_string(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        self.bump(); // opening quote
        let mut hex = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString(start.line, start.col)),
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    hex.push(c as char);
                    self.bump();
                }
            }
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        let chars: Vec<char> = hex.chars().collect();
        if chars.len() % 2 != 0 {
            return Err(LexError::InvalidHex(start.line, start.col));
        }
        for pair in chars.chunks(2) {
            let s: String = pair.iter().collect();
            let byte = u8::from_str_radix(&s, 16).map_err(|_| LexError::InvalidHex(start.line, start.col))?;
            bytes.push(byte);
        }
        Ok(Token::HexString(bytes))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'.' || c == b'$'
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lexes_a_function_header() {
        assert_eq!(
            toks("function f(%0) {"),
            vec![
                Token::Ident("function".into()),
                Token::Ident("f".into()),
                Token::LParen,
                Token::Var("0".into()),
                Token::RParen,
                Token::LBrace,
            ]
        );
    }

    #[test]
    fn collapses_consecutive_terminators() {
        assert_eq!(toks("a\n\n;\nb"), vec![Token::Ident("a".into()), Token::Semi, Token::Ident("b".into())]);
    }

    #[test]
    fn hex_literal_and_string() {
        assert_eq!(toks("0xff"), vec![Token::Int(U256::from(255u64))]);
        assert_eq!(toks("\"deadbeef\""), vec![Token::HexString(vec![0xde, 0xad, 0xbe, 0xef])]);
    }
}
