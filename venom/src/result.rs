//! Error taxonomy.
//!
//! Two distinct propagation policies are in play, matching the contract in
//! the design notes: structural and parser diagnostics are collected and
//! reported together (an [`ErrorGroup`]), while an internal invariant
//! violation discovered mid-pass is a programmer error and is reported by
//! panicking immediately rather than threading a `Result` through every
//! call site that could, in principle, never actually fail.

use std::fmt;

use crate::ir::{Block, Inst, Var};

/// A single structural/semantic problem found in a function, as produced by
/// the calling-convention check and the post-pipeline semantic checker.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VenomError {
    #[error("basic block {0} is not terminated")]
    BasicBlockNotTerminated(Block),

    #[error("variable {0} used in block {1} without a reaching definition")]
    VarNotDefined(Var, Block),

    #[error("instruction {0} references undefined basic block {1}")]
    UndefinedBlock(Inst, Block),

    #[error("function has no entry block")]
    NoEntryBlock,

    #[error("value {0} has more than one definition")]
    DoubleDefinition(Var),

    #[error("instruction {0} expects {expected} operands, found {found}", expected = .expected, found = .found)]
    ArityMismatch { inst: Inst, expected: usize, found: usize },

    #[error("{0}")]
    Other(String),
}

/// A non-empty collection of [`VenomError`]s, accumulated rather than raised
/// at the first failure so a caller sees every problem in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorGroup {
    errors: Vec<VenomError>,
}

impl ErrorGroup {
    pub fn new() -> Self {
        ErrorGroup { errors: Vec::new() }
    }

    pub fn push(&mut self, error: VenomError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[VenomError] {
        &self.errors
    }

    /// Turn this group into a `Result`, discarding it if empty.
    pub fn into_result(self) -> Result<(), ErrorGroup> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn extend(&mut self, other: ErrorGroup) {
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} error(s) found:", self.errors.len())?;
        for e in &self.errors {
            writeln!(f, "  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorGroup {}

pub type VenomResult<T> = Result<T, ErrorGroup>;
