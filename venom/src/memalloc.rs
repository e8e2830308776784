//! The global abstract-memory bump allocator and the two-pass deploy-memory
//! sizing algorithm built on top of it.
//!
//! Every abstract memory location (`alloca`s, free-variable scratch words,
//! the deploy-code region) is placed by bumping a single watermark,
//! "end-of-memory" (`eom`). For a contract with constructor code, the
//! deploy region has to live at a fixed, known-in-advance offset, but the
//! constructor's own scratch usage can only be measured by actually running
//! the pipeline once. [`build_with_deploy_sizing`] resolves that with the
//! same two-pass approach the source system uses: build once, measure the
//! peak watermark (ignoring the deploy region and the two permanent
//! free-variable slots), then rebuild with that peak as the starting
//! watermark and assert the rebuild didn't grow past it.

use rustc_hash::FxHashMap;

use crate::ir::memloc::MemLocPlacement;
use crate::ir::MemLocId;

#[derive(Clone, Debug, Default)]
pub struct MemAllocator {
    pub eom: usize,
    allocated: FxHashMap<MemLocId, MemLocPlacement>,
}

impl MemAllocator {
    pub fn new() -> Self {
        MemAllocator::default()
    }

    pub fn starting_at(eom: usize) -> Self {
        MemAllocator { eom, allocated: FxHashMap::default() }
    }

    /// Bump-allocate `size` bytes and record the placement for `id`.
    pub fn allocate(&mut self, id: MemLocId, size: usize) -> MemLocPlacement {
        let placement = MemLocPlacement { offset: self.eom, size };
        self.eom += size;
        self.allocated.insert(id, placement);
        placement
    }

    /// Place `id` at an exact offset, bypassing the bump allocator. Used to
    /// seed the deploy-code region at offset zero (`codecopy`/`dload`
    /// instructions address it absolutely) without disturbing the
    /// constructor's own scratch watermark.
    pub fn allocate_fixed_at(&mut self, id: MemLocId, offset: usize, size: usize) -> MemLocPlacement {
        let placement = MemLocPlacement { offset, size };
        self.allocated.insert(id, placement);
        placement
    }

    pub fn placement_of(&self, id: MemLocId) -> Option<MemLocPlacement> {
        self.allocated.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemLocId, MemLocPlacement)> + '_ {
        self.allocated.iter().map(|(&k, &v)| (k, v))
    }
}

/// Run `build` once to measure the constructor's true peak memory use, then
/// run it again passing that peak in as the starting watermark, and assert
/// the second run's peak does not exceed the first. `build` is handed the
/// starting watermark (`None` on the first call, `Some(peak)` on the
/// second) and is expected to return the context's [`MemAllocator`] and the
/// id of the deploy region, if any, alongside its result so this function
/// can compute the peak without reaching into the caller's internals.
///
/// This asserts rather than returning a `Result` because a shrinking or
/// growing peak between the two passes means the pipeline's own passes are
/// not deterministic with respect to memory layout, which is a compiler bug,
/// not a user-facing error.
pub fn build_with_deploy_sizing<T>(
    mut build: impl FnMut(Option<usize>) -> (T, MemAllocator, Vec<MemLocId>),
) -> T {
    let (_, first_alloc, first_skip) = build(None);
    let peak = peak_excluding(&first_alloc, &first_skip);

    let (result, final_alloc, final_skip) = build(Some(peak));
    let final_peak = peak_excluding(&final_alloc, &final_skip);
    assert!(
        final_peak <= peak,
        "ctor peak grew after override: initial {peak}, final {final_peak}"
    );
    result
}

fn peak_excluding(alloc: &MemAllocator, skip: &[MemLocId]) -> usize {
    alloc
        .iter()
        .filter(|(id, _)| !skip.contains(id))
        .map(|(_, p)| p.end())
        .max()
        .unwrap_or(0)
}

/// Convenience for the two permanent free-variable scratch words plus an
/// optional deploy region, the fixed skip-list the source system uses when
/// measuring the ctor peak.
pub fn default_skip_list(
    free_var1: MemLocId,
    free_var2: MemLocId,
    deploy_region: Option<MemLocId>,
) -> Vec<MemLocId> {
    let mut v = vec![free_var1, free_var2];
    v.extend(deploy_region);
    v
}

pub const WORD_SIZE: usize = 32;

pub fn default_alloca_size() -> usize {
    WORD_SIZE
}
