//! Abstract memory locations: placeholders for a memory offset that the
//! frontend doesn't yet know (a local variable's home, scratch space for
//! intermediate expressions) which `ConcretizeMemLocPass` later assigns a
//! real offset via [`crate::memalloc`]. Keeping the placement decision
//! separate from the reference to it is what lets the two-pass
//! deploy-memory sizing algorithm rebuild a function with a different
//! watermark without having to rewrite every instruction that mentions the
//! location.

use crate::ir::MemLocId;

/// What an abstract location is for, used only for diagnostics and for a
/// couple of special locations the pipeline itself depends on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemLocKind {
    /// A spill slot for an `alloca`d local.
    Alloca,
    /// Scratch space introduced by a pass (e.g. `Mem2Var` materializing a
    /// variable that must be addressable again for a call).
    Scratch,
    /// One of the two always-allocated free-variable scratch words every
    /// function gets, used by codegen for expression temporaries that don't
    /// fit on the operand stack.
    FreeVar1,
    FreeVar2,
    /// The fixed region holding the contract's deploy-time constructor
    /// scratch code, seeded at a fixed offset by the two-pass sizing
    /// algorithm.
    DeployRegion,
}

#[derive(Copy, Clone, Debug)]
pub struct AbstractMemLoc {
    pub kind: MemLocKind,
    /// Size in bytes. `alloca` locations may span more than one word.
    pub size: usize,
    /// A volatile location is excluded from [`crate::passes::dead_store_elimination`]:
    /// every store to it is treated as potentially observed, even one
    /// immediately overwritten by a later store to the same offset. Set by
    /// the frontend for locations it knows get read by something the IR
    /// can't see (e.g. a slot handed to inline assembly).
    pub volatile: bool,
}

impl AbstractMemLoc {
    pub fn new(kind: MemLocKind, size: usize) -> Self {
        AbstractMemLoc { kind, size, volatile: false }
    }

    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }
}

/// The concrete placement of a [`MemLocId`] once `ConcretizeMemLocPass` (or
/// the deploy-sizing rebuild) has run: a byte offset, plus the size that was
/// reserved for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemLocPlacement {
    pub offset: usize,
    pub size: usize,
}

impl MemLocPlacement {
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

pub type MemLocTable = crate::entity::PrimaryMap<MemLocId, AbstractMemLoc>;
