//! The entity reference types used throughout the IR: a [`Block`] or
//! [`Inst`] or [`Var`] is a small `Copy` index, never an owning pointer, so
//! the IR's inherently cyclic graph (blocks branching to each other,
//! instructions referencing values defined later in a loop) can live in flat
//! arenas instead of `Rc`/`RefCell` soup.

use std::fmt;
use std::rc::Rc;

use crate::entity::entity_impl;

/// A basic block.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "bb");

/// An instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// An SSA value, called a "variable" throughout the rest of this crate and
/// its diagnostics because before [`MakeSSA`](crate::passes::make_ssa) runs
/// a `Var` may have more than one defining instruction; after it, exactly
/// one. Block parameters (phi inputs) and instruction results are both
/// `Var`s.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);
entity_impl!(Var, "%");

/// An abstract, not-yet-placed memory location, as produced by the frontend
/// before `ConcretizeMemLocPass` assigns it a concrete offset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemLocId(u32);
entity_impl!(MemLocId, "memloc");

/// A function, keyed in [`crate::ir::Context`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u32);
entity_impl!(FuncId, "fn");

/// A symbolic label: a block name, a function entry name, or a data-section
/// name. Unlike the other entities, labels are not arena-indexed — they are
/// the textual identity blocks and calls are printed and parsed with, so
/// they're carried as cheaply-cloned interned strings rather than indices.
///
/// The inliner needs to duplicate a callee's blocks into the caller without
/// colliding with existing names; it does so by attaching a numeric suffix,
/// mirroring how the source system's `IRLabel` carries a uniquifying `value`
/// alongside its printable name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    name: Rc<str>,
}

impl Label {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Label { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Derive a fresh label that will not collide with `self` when both are
    /// in scope, used when the inliner clones a callee's blocks into a
    /// caller. `suffix` should be unique per inlined call site.
    pub fn uniquified(&self, suffix: u64) -> Label {
        Label::new(format!("{}.{}", self.name, suffix))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::new(s)
    }
}
