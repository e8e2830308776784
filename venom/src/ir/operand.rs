//! The operand sum type: every instruction input is one of a use of an SSA
//! value, a literal 256-bit word, or a symbolic label. Keeping this as a
//! single small enum (rather than separate typed operand lists per
//! instruction kind) is what lets the editing primitives, the stack
//! scheduler, and the printer all walk "the operands of an instruction"
//! uniformly.

use std::fmt;

use alloy_primitives::U256;

use crate::ir::{Label, Var};

/// A 256-bit EVM word. A thin alias over `alloy_primitives::U256` so the
/// rest of the crate has one name for "the value type" independent of which
/// bignum crate backs it.
pub type Word = U256;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal(pub Word);

impl Literal {
    pub fn from_u64(v: u64) -> Self {
        Literal(Word::from(v))
    }

    pub fn zero() -> Self {
        Literal(Word::ZERO)
    }

    pub fn one() -> Self {
        Literal(Word::from(1u64))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0 == Word::from(1u64)
    }

    /// `true` if the value fits a power of two, returning its exponent.
    /// Used by `AlgebraicOptimizationPass` to rewrite `mul`/`div` by a
    /// power of two into `shl`/`shr`.
    pub fn pow2_exponent(&self) -> Option<u32> {
        if self.0.is_zero() {
            return None;
        }
        if (self.0 & (self.0 - Word::from(1u64))).is_zero() {
            Some(self.0.bit_len() as u32 - 1)
        } else {
            None
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One operand of an instruction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    /// A use of a previously-defined (or, pre-SSA, possibly
    /// multiply-defined) variable.
    Var(Var),
    /// An immediate 256-bit constant.
    Literal(Literal),
    /// A reference to a block or function by name, e.g. a `jmp` target or
    /// an `invoke` callee.
    Label(Label),
}

impl Operand {
    pub fn as_var(&self) -> Option<Var> {
        match self {
            Operand::Var(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Operand::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Operand::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Var(v) => write!(f, "{v}"),
            Operand::Literal(l) => write!(f, "{l}"),
            Operand::Label(l) => write!(f, "@{l}"),
        }
    }
}

impl From<Var> for Operand {
    fn from(v: Var) -> Self {
        Operand::Var(v)
    }
}

impl From<Literal> for Operand {
    fn from(l: Literal) -> Self {
        Operand::Literal(l)
    }
}

impl From<Label> for Operand {
    fn from(l: Label) -> Self {
        Operand::Label(l)
    }
}
