//! Compilation settings shared by the pipeline, inliner, and codesize passes.

/// The optimization goal requested for a compilation. Mirrors the levels the
/// rest of the toolchain exposes; the pass pipeline branches on this in a
/// handful of places (the inliner's budget, whether `ReduceLiteralsCodesize`
/// runs at all).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OptimizeLevel {
    /// Run structural passes only; skip anything whose only purpose is to
    /// reduce gas or code size.
    None,
    /// Optimize for runtime gas cost. The default.
    Gas,
    /// Optimize for deployed code size, at the potential expense of gas.
    Codesize,
}

impl Default for OptimizeLevel {
    fn default() -> Self {
        OptimizeLevel::Gas
    }
}

impl OptimizeLevel {
    pub fn is_none(self) -> bool {
        matches!(self, OptimizeLevel::None)
    }

    pub fn is_codesize(self) -> bool {
        matches!(self, OptimizeLevel::Codesize)
    }
}

/// Knobs read by the pipeline and inliner. Constructed directly by the host;
/// this crate does not parse CLI flags or config files.
#[derive(Clone, Debug)]
pub struct Settings {
    pub optimize: OptimizeLevel,
    /// Maximum estimated instruction-count growth the inliner will accept
    /// for a single call site before refusing to inline it.
    pub inliner_size_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { optimize: OptimizeLevel::default(), inliner_size_threshold: 64 }
    }
}

impl Settings {
    pub fn new(optimize: OptimizeLevel) -> Self {
        Settings { optimize, ..Settings::default() }
    }
}
