//! Segregated free-list index.
//!
//! Twelve size-class buckets, each the head of a doubly linked list threaded
//! through the `next`/`prev` offset words of its free blocks (see
//! [`crate::block`]). Bucket-head storage lives in a [`Buckets`] value owned
//! by [`crate::heap::Heap`] rather than in process-wide statics.

use crate::block;
use std::ptr;

/// Number of size-class buckets.
pub const BUCKET_COUNT: usize = 12;

/// Inclusive upper bounds of buckets 0..10. Bucket 11 (the last) holds
/// everything larger than the final bound.
const BUCKET_BOUNDS: [usize; BUCKET_COUNT - 1] =
  [16, 32, 40, 72, 132, 520, 1032, 2056, 3080, 5128, 7168];

/// Selects the bucket index for a block of `size` bytes.
///
/// A branch per class, not a log-base computation, because the bounds above
/// are not regular powers of two.
pub fn bucket_index(size: usize) -> usize {
  for (index, &bound) in BUCKET_BOUNDS.iter().enumerate() {
    if size <= bound {
      return index;
    }
  }
  BUCKET_COUNT - 1
}

/// The twelve free-list heads, plus the bucket-selection logic that keeps
/// them consistent.
#[derive(Debug)]
pub struct Buckets {
  heads: [*mut u8; BUCKET_COUNT],
}

impl Buckets {
  /// Creates an empty set of buckets (all heads null).
  pub fn new() -> Self {
    Self {
      heads: [ptr::null_mut(); BUCKET_COUNT],
    }
  }

  /// Returns the current head of bucket `index`, or null if empty.
  pub fn head(&self, index: usize) -> *mut u8 {
    self.heads[index]
  }

  /// Directly sets the head of bucket `index`. Used only by the first
  /// coalesce, which seeds the bucket for the initial whole-heap block
  /// without going through [`Buckets::push_head`].
  pub fn set_head(
    &mut self,
    index: usize,
    bp: *mut u8,
  ) {
    self.heads[index] = bp;
  }

  /// Inserts `bp` (already free, not currently linked into any bucket) at
  /// the head of the bucket selected by its own size.
  ///
  /// # Safety
  /// `bp` must be a legal, free block pointer within `base`'s region.
  pub unsafe fn push_head(
    &mut self,
    base: *mut u8,
    bp: *mut u8,
  ) {
    let size = unsafe { block::size_of(bp) };
    let index = bucket_index(size);
    let old_head = self.heads[index];

    unsafe {
      block::set_prev_link(bp, 0);
      block::set_next_link(bp, block::to_offset(base, old_head));
      if !old_head.is_null() {
        block::set_prev_link(old_head, block::to_offset(base, bp));
      }
    }

    self.heads[index] = bp;
    log::trace!(
      "bucket[{index}]: pushed block at offset {} (size {size})",
      block::to_offset(base, bp)
    );
  }

  /// Removes a block from its bucket, given the `next`/`prev` offsets it
  /// carried and the bucket-selecting `size` *before* any split rewrote
  /// it. Takes offsets rather than a block pointer: the coalescer reads
  /// these before rewriting headers, so the block itself may no longer be
  /// meaningful by the time `unlink` runs.
  ///
  /// # Safety
  /// `next_offset`/`prev_offset`, if non-zero, must name legal, free block
  /// pointers within `base`'s region. `size` must be the size under which
  /// the removed block was (or would have been) indexed.
  pub unsafe fn unlink(
    &mut self,
    base: *mut u8,
    next_offset: u32,
    prev_offset: u32,
    size: usize,
  ) {
    let index = bucket_index(size);

    if prev_offset == 0 {
      self.heads[index] = block::from_offset(base, next_offset);
    } else {
      let prev_bp = block::from_offset(base, prev_offset);
      unsafe { block::set_next_link(prev_bp, next_offset) };
    }

    if next_offset != 0 {
      let next_bp = block::from_offset(base, next_offset);
      unsafe { block::set_prev_link(next_bp, prev_offset) };
    }

    log::trace!("bucket[{index}]: unlinked (next={next_offset}, prev={prev_offset})");
  }
}

impl Default for Buckets {
  fn default() -> Self {
    Self::new()
  }
}
