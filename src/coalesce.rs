//! Boundary-tag coalescer.
//!
//! Merges a newly-freed block with its immediate neighbours so that
//! invariant I3 (no two adjacent free blocks) holds after every `release`
//! and every region extension. Translated from `mm.c`'s `coalesce`,
//! including its `forinit` special case for the very first free block ever
//! seen, before any bucket has meaningful contents to merge into.

use crate::block;
use crate::buckets::{Buckets, bucket_index};

/// Coalesces `bp`, a block already written as free (header and footer both
/// encode `allocated = false`), with any free neighbours, inserting the
/// result into the appropriate bucket. Returns the surviving block pointer
/// (which may be `bp` itself, or a neighbour it merged into).
///
/// `first_coalesce` starts `true` and is cleared on the first call: before
/// any block has been placed, the bucket heads have no meaningful
/// invariants to reason about, so the first coalesce just seeds the bucket
/// directly with the whole-heap free block instead of running the four-case
/// logic below.
///
/// # Safety
/// `bp` must be a legal free block pointer within `base`'s region, and its
/// immediate neighbours (as found via [`block::prev_block`] /
/// [`block::next_block`]) must themselves be legal blocks — true for any
/// region bounded by the prologue/epilogue sentinels.
pub unsafe fn coalesce(
  base: *mut u8,
  buckets: &mut Buckets,
  first_coalesce: &mut bool,
  bp: *mut u8,
) -> *mut u8 {
  if *first_coalesce {
    *first_coalesce = false;
    let size = unsafe { block::size_of(bp) };
    unsafe {
      block::set_next_link(bp, 0);
      block::set_prev_link(bp, 0);
    }
    buckets.set_head(bucket_index(size), bp);
    log::debug!("coalesce: seeded initial free block of {size} bytes");
    return bp;
  }

  let prev = unsafe { block::prev_block(bp) };
  let next = unsafe { block::next_block(bp) };
  let prev_alloc = unsafe { block::is_allocated(prev) };
  let next_alloc = unsafe { block::is_allocated(next) };
  let mut size = unsafe { block::size_of(bp) };

  let merged = match (prev_alloc, next_alloc) {
    (true, true) => {
      unsafe { buckets.push_head(base, bp) };
      bp
    }
    (true, false) => {
      unsafe { unlink_neighbour(base, buckets, next) };
      size += unsafe { block::size_of(next) };
      unsafe {
        block::write_block(bp, size, false);
        buckets.push_head(base, bp);
      }
      bp
    }
    (false, true) => {
      unsafe { unlink_neighbour(base, buckets, prev) };
      size += unsafe { block::size_of(prev) };
      unsafe {
        block::write_block(prev, size, false);
        buckets.push_head(base, prev);
      }
      prev
    }
    (false, false) => {
      unsafe { unlink_neighbour(base, buckets, next) };
      unsafe { unlink_neighbour(base, buckets, prev) };
      size += unsafe { block::size_of(next) } + unsafe { block::size_of(prev) };
      unsafe {
        block::write_block(prev, size, false);
        buckets.push_head(base, prev);
      }
      prev
    }
  };

  log::trace!(
    "coalesce: merged block at offset {} (final size {size})",
    block::to_offset(base, merged)
  );
  merged
}

/// Removes `victim` (a known-free neighbour about to be merged away) from
/// its bucket, reading its links and size before anything about it changes.
unsafe fn unlink_neighbour(
  base: *mut u8,
  buckets: &mut Buckets,
  victim: *mut u8,
) {
  let size = unsafe { block::size_of(victim) };
  let next_offset = unsafe { block::next_link(victim) };
  let prev_offset = unsafe { block::prev_link(victim) };
  unsafe { buckets.unlink(base, next_offset, prev_offset, size) };
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Lays out `[prologue(8,alloc)][...blocks...][epilogue(0,alloc)]` over
  /// a byte buffer, returning `(buffer, base)` where `base` is the
  /// prologue's payload pointer — matching `heap_listp` in `mm.c`.
  fn heap_with_blocks(sizes_and_alloc: &[(usize, bool)]) -> (Vec<u64>, *mut u8) {
    let payload_total: usize = sizes_and_alloc.iter().map(|(s, _)| s).sum();
    let total = 8 + payload_total + 4; // prologue(8) + blocks + epilogue header(4)
    // Backed by `u64` so the region starts 8-byte aligned.
    let mut mem = vec![0u64; total.div_ceil(8)];
    let raw = mem.as_mut_ptr().cast::<u8>();

    // Prologue occupies the first 8 bytes; its "payload" is zero-sized,
    // so base is positioned right after its header+footer pair.
    let base = unsafe { raw.add(4) }; // base = payload pointer of an 8-byte allocated block
    unsafe { block::write_block(base, 8, true) };

    let mut cursor = base;
    for &(size, allocated) in sizes_and_alloc {
      cursor = unsafe { block::next_block(cursor) };
      unsafe { block::write_block(cursor, size, allocated) };
    }
    let epilogue = unsafe { block::next_block(cursor) };
    unsafe { block::write_epilogue(epilogue) };

    (mem, base)
  }

  #[test]
  fn first_coalesce_seeds_bucket_without_merging() {
    let (_mem, base) = heap_with_blocks(&[(512, false)]);
    let bp = unsafe { block::next_block(base) };

    let mut buckets = Buckets::new();
    let mut first = true;
    let result = unsafe { coalesce(base, &mut buckets, &mut first, bp) };

    assert_eq!(result, bp);
    assert!(!first);
    assert_eq!(buckets.head(bucket_index(512)), bp);
  }

  #[test]
  fn alloc_alloc_neighbours_just_inserts() {
    let (_mem, base) = heap_with_blocks(&[(24, true), (32, false), (24, true)]);
    let bp = unsafe { block::next_block(base) }; // the 32-byte free block

    let mut buckets = Buckets::new();
    let mut first = false;
    let result = unsafe { coalesce(base, &mut buckets, &mut first, bp) };

    assert_eq!(result, bp);
    assert_eq!(unsafe { block::size_of(bp) }, 32);
    assert_eq!(buckets.head(bucket_index(32)), bp);
  }

  #[test]
  fn free_next_neighbour_merges_forward() {
    let (_mem, base) = heap_with_blocks(&[(24, true), (24, false), (40, false)]);
    let a = unsafe { block::next_block(base) };
    let b = unsafe { block::next_block(a) };

    let mut buckets = Buckets::new();
    let mut first = true;
    unsafe { coalesce(base, &mut buckets, &mut first, b) }; // seed with b

    let result = unsafe { coalesce(base, &mut buckets, &mut first, a) };
    assert_eq!(result, a);
    assert_eq!(unsafe { block::size_of(a) }, 64);
    assert_eq!(buckets.head(bucket_index(64)), a);
  }

  #[test]
  fn free_both_neighbours_merges_into_prev() {
    // Start with the middle block allocated, so `prev` and `next` are
    // properly registered as free (with real bucket links) before the
    // middle block is released and triggers the merge under test.
    let (_mem, base) = heap_with_blocks(&[(24, false), (24, true), (40, false)]);
    let prev = unsafe { block::next_block(base) };
    let middle = unsafe { block::next_block(prev) };
    let next = unsafe { block::next_block(middle) };

    let mut buckets = Buckets::new();
    let mut first = true;
    unsafe { coalesce(base, &mut buckets, &mut first, prev) };
    unsafe { coalesce(base, &mut buckets, &mut first, next) };

    unsafe { block::write_block(middle, 24, false) };
    let result = unsafe { coalesce(base, &mut buckets, &mut first, middle) };
    assert_eq!(result, prev);
    assert_eq!(unsafe { block::size_of(prev) }, 24 + 24 + 40);
    assert_eq!(buckets.head(bucket_index(88)), prev);
  }
}
