//! Reader-specific error kinds, folded into the same [`venom::result::ErrorGroup`]
//! the rest of the crate reports structural problems through — a parse
//! failure and a post-parse structural check are both "the user's textual
//! input doesn't describe valid IR," and the spec asks for both to be
//! collected into one batch rather than surfaced one at a time.

use venom::result::VenomError;

use crate::lexer::{LexError, Span};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("{line}:{col}: expected {expected}, found {found}")]
    UnexpectedToken { line: u32, col: u32, expected: String, found: String },

    #[error("{line}:{col}: unknown opcode `{name}`")]
    UnknownOpcode { line: u32, col: u32, name: String },

    #[error("{line}:{col}: block `{label}` is referenced but never defined")]
    DanglingLabel { line: u32, col: u32, label: String },

    #[error("{line}:{col}: duplicate block label `{label}` in function `{func}`")]
    DuplicateBlock { line: u32, col: u32, label: String, func: String },
}

impl ReadError {
    pub fn at(span: Span, expected: impl Into<String>, found: impl Into<String>) -> Self {
        ReadError::UnexpectedToken { line: span.line, col: span.col, expected: expected.into(), found: found.into() }
    }
}

impl From<ReadError> for VenomError {
    fn from(e: ReadError) -> Self {
        VenomError::Other(e.to_string())
    }
}
