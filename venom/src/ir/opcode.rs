//! Opcodes: the vocabulary of a stack-machine program expressed as
//! three-operand SSA instructions instead of a stack. Each variant below
//! corresponds 1:1 with an EVM opcode, plus a handful of venom-only pseudo
//! ops (`phi`, `assign`, `param`, `offset`, `invoke`, jump variants) that
//! exist purely in the IR and are lowered away before assembly.

use std::fmt;

/// Classifies an opcode's observable effect on the outside world, used by
/// [`crate::ir::effects`] to build the per-opcode effect table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// `phi`, `invoke`/multi-return calls, and variadic `log`: operand count
    /// is only known per-instance.
    Variable,
}

macro_rules! opcodes {
    ($($variant:ident => $text:literal),* $(,)?) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[allow(non_camel_case_types)]
        pub enum Opcode {
            $($variant),*
        }

        impl Opcode {
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $text),*
                }
            }

            pub fn from_name(name: &str) -> Option<Opcode> {
                match name {
                    $($text => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // Arithmetic
    Add => "add", Sub => "sub", Mul => "mul", Div => "div", Sdiv => "sdiv",
    Mod => "mod", Smod => "smod", Addmod => "addmod", Mulmod => "mulmod",
    Exp => "exp", Signextend => "signextend",
    // Comparisons / bitwise
    Lt => "lt", Gt => "gt", Slt => "slt", Sgt => "sgt", Eq => "eq", Iszero => "iszero",
    And => "and", Or => "or", Xor => "xor", Not => "not",
    Shl => "shl", Shr => "shr", Sar => "sar", Byte => "byte",
    // Hashing
    Sha3 => "sha3", Sha3_64 => "sha3_64",
    // Environment
    Address => "address", Balance => "balance", Origin => "origin", Caller => "caller",
    Callvalue => "callvalue", Calldataload => "calldataload", Calldatasize => "calldatasize",
    Calldatacopy => "calldatacopy", Codesize => "codesize", Codecopy => "codecopy",
    Gasprice => "gasprice", Extcodesize => "extcodesize", Extcodecopy => "extcodecopy",
    Returndatasize => "returndatasize", Returndatacopy => "returndatacopy",
    Extcodehash => "extcodehash", Selfbalance => "selfbalance",
    // Block
    Blockhash => "blockhash", Coinbase => "coinbase", Timestamp => "timestamp",
    Number => "number", Prevrandao => "prevrandao", Gaslimit => "gaslimit",
    Chainid => "chainid", Basefee => "basefee", Blobbasefee => "blobbasefee",
    // Storage / memory
    Pop => "pop", Mload => "mload", Mstore => "mstore", Mstore8 => "mstore8",
    Mcopy => "mcopy", Sload => "sload", Sstore => "sstore", Tload => "tload",
    Tstore => "tstore", Msize => "msize", Gas => "gas",
    // Control flow (venom-specific shapes over jump/jumpi)
    Jmp => "jmp", Jnz => "jnz", Djmp => "djmp", Ret => "ret",
    // Data-section / venom pseudo ops
    Phi => "phi", Assign => "assign", Param => "param", Offset => "offset",
    Store => "store", Alloca => "alloca", Palloca => "palloca", Calloca => "calloca",
    Dload => "dload", Dloadbytes => "dloadbytes",
    // Calls
    Invoke => "invoke", Call => "call", Staticcall => "staticcall",
    Delegatecall => "delegatecall", Create => "create", Create2 => "create2",
    // Terminal
    Return => "return", Revert => "revert", Stop => "stop", Selfdestruct => "selfdestruct",
    Invalid => "invalid", AssertUnreachable => "assert_unreachable",
    // Logging / assertions
    Log0 => "log0", Log1 => "log1", Log2 => "log2", Log3 => "log3", Log4 => "log4",
    Assert => "assert",
}

impl Opcode {
    pub fn arity(self) -> Arity {
        use Opcode::*;
        match self {
            Phi | Invoke | Call | Staticcall | Delegatecall | Ret => Arity::Variable,
            Log0 => Arity::Fixed(2),
            Log1 => Arity::Fixed(3),
            Log2 => Arity::Fixed(4),
            Log3 => Arity::Fixed(5),
            Log4 => Arity::Fixed(6),
            Not | Iszero | Mload | Sload | Tload | Balance | Extcodesize | Extcodehash
            | Calldataload | Blockhash | Pop | Assign | Param | Return | Assert
            | AssertUnreachable | Dload => Arity::Fixed(1),
            Jmp | Djmp => Arity::Fixed(1),
            Jnz => Arity::Fixed(2),
            Stop | Selfdestruct | Invalid | Msize | Gas | Address | Origin | Caller
            | Callvalue | Calldatasize | Codesize | Gasprice | Returndatasize | Coinbase
            | Timestamp | Number | Prevrandao | Gaslimit | Chainid | Basefee | Blobbasefee
            | Selfbalance => Arity::Fixed(0),
            Mstore | Sstore | Tstore | Mstore8 | Byte | Lt | Gt | Slt | Sgt | Eq | Shl | Shr
            | Sar | And | Or | Xor | Add | Sub | Mul | Div | Sdiv | Mod | Smod
            | Signextend | Sha3 => Arity::Fixed(2),
            Sha3_64 | Addmod | Mulmod | Create | Calldatacopy | Codecopy
            | Returndatacopy | Mcopy | Alloca | Offset => Arity::Fixed(3),
            Extcodecopy | Create2 | Exp | Store | Palloca | Calloca | Dloadbytes => {
                Arity::Fixed(3)
            }
            Revert | Return => Arity::Fixed(2),
        }
    }

    pub fn is_terminator(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Jmp | Jnz | Djmp | Ret | Return | Revert | Stop | Selfdestruct | Invalid
                | AssertUnreachable
        )
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jnz | Opcode::Djmp)
    }

    pub fn is_conditional_branch(self) -> bool {
        matches!(self, Opcode::Jnz)
    }

    pub fn is_phi(self) -> bool {
        matches!(self, Opcode::Phi)
    }

    pub fn is_call(self) -> bool {
        matches!(
            self,
            Opcode::Invoke
                | Opcode::Call
                | Opcode::Staticcall
                | Opcode::Delegatecall
                | Opcode::Create
                | Opcode::Create2
        )
    }

    pub fn is_return(self) -> bool {
        matches!(self, Opcode::Return | Opcode::Ret)
    }

    pub fn can_trap(self) -> bool {
        matches!(
            self,
            Opcode::Div
                | Opcode::Sdiv
                | Opcode::Mod
                | Opcode::Smod
                | Opcode::Invalid
                | Opcode::AssertUnreachable
                | Opcode::Assert
        )
    }

    pub fn can_load(self) -> bool {
        matches!(
            self,
            Opcode::Mload
                | Opcode::Sload
                | Opcode::Tload
                | Opcode::Calldataload
                | Opcode::Dload
                | Opcode::Dloadbytes
        )
    }

    pub fn can_store(self) -> bool {
        matches!(
            self,
            Opcode::Mstore
                | Opcode::Mstore8
                | Opcode::Sstore
                | Opcode::Tstore
                | Opcode::Mcopy
                | Opcode::Calldatacopy
                | Opcode::Codecopy
                | Opcode::Returndatacopy
                | Opcode::Extcodecopy
        )
    }

    /// Other world-visible effects that are neither a load nor a store in
    /// the memory-operand sense (logs, calls, self-destruct).
    pub fn other_side_effects(self) -> bool {
        self.is_call()
            || matches!(
                self,
                Opcode::Log0
                    | Opcode::Log1
                    | Opcode::Log2
                    | Opcode::Log3
                    | Opcode::Log4
                    | Opcode::Selfdestruct
            )
    }

    /// True for opcodes whose result is a pure function of their operands:
    /// safe to common-subexpression-eliminate or constant-fold.
    pub fn is_pure(self) -> bool {
        !self.can_load()
            && !self.can_store()
            && !self.other_side_effects()
            && !self.is_terminator()
            && !self.is_phi()
            && !matches!(
                self,
                Opcode::Assign
                    | Opcode::Param
                    | Opcode::Gas
                    | Opcode::Msize
                    | Opcode::Alloca
                    | Opcode::Palloca
                    | Opcode::Calloca
                    | Opcode::Store
                    | Opcode::Balance
                    | Opcode::Blockhash
                    | Opcode::Extcodesize
                    | Opcode::Extcodehash
            )
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Mul
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Eq
                | Opcode::Addmod
                | Opcode::Mulmod
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrips_through_from_name() {
        for op in [Opcode::Add, Opcode::Phi, Opcode::Invoke, Opcode::Jnz] {
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn pure_excludes_side_effecting_ops() {
        assert!(Opcode::Add.is_pure());
        assert!(!Opcode::Mstore.is_pure());
        assert!(!Opcode::Call.is_pure());
        assert!(!Opcode::Phi.is_pure());
    }
}
