//! Tunable constants for the allocator.
//!
//! The distilled specification hardcodes two numbers: the size of the first
//! region extension performed during `init`, and the floor used when growing
//! the region to satisfy an allocation that didn't fit any existing free
//! block (`max(asize, 512)`). Both default to 512 bytes, matching `mm.c`'s
//! `CHUNKSIZE`. Collecting them into a `Config` lets an embedder retune heap
//! growth behaviour for its workload without forking the allocator; this is
//! the library's only "configuration surface" — there is no CLI or env var
//! to parse, since nothing here is a binary's concern.

/// Tunable parameters controlling how eagerly [`crate::heap::Heap`] grows its
/// backing region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes requested from the region provider the first time the heap is
    /// initialized, immediately after the prologue/epilogue are laid down.
    pub initial_extend_bytes: usize,
    /// Floor on the number of bytes requested from the region provider when
    /// no existing free block fits an allocation request.
    pub min_extend_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_extend_bytes: 512,
            min_extend_bytes: 512,
        }
    }
}
