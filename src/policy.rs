//! Allocation policy: fit selection, splitting, and region growth.
//!
//! Translated from `mm.c`'s `find_fit`, `place`, and `extend_heap`. These
//! functions assume the caller (`crate::heap::Heap`) already holds `&mut`
//! access to the buckets and region base for the duration of the call — they
//! carry no locking of their own, matching the single-actor scope this
//! allocator targets.

use crate::block;
use crate::buckets::{BUCKET_COUNT, Buckets, bucket_index};
use crate::coalesce::coalesce;
use crate::error::Result;
use crate::region::RegionProvider;
use std::ptr;

/// Finds a free block of at least `asize` bytes, searching the bucket that
/// `asize` itself would land in first, then every larger bucket in order.
/// Within a bucket, the first block found that fits is taken (first-fit),
/// not the best fit — the classic malloc-lab tradeoff of placement speed
/// over fragmentation.
///
/// Returns a null pointer if no free block anywhere is large enough.
///
/// # Safety
/// Every bucket head (and everything reachable by walking `next` links from
/// it) must be a legal free block pointer within `base`'s region.
pub unsafe fn find_fit(
  buckets: &Buckets,
  base: *mut u8,
  asize: usize,
) -> *mut u8 {
  for index in bucket_index(asize)..BUCKET_COUNT {
    let mut bp = buckets.head(index);
    while !bp.is_null() {
      if unsafe { block::size_of(bp) } >= asize {
        return bp;
      }
      bp = unsafe { block::from_offset(base, block::next_link(bp)) };
    }
  }
  ptr::null_mut()
}

/// Places an `asize`-byte allocation into free block `bp`, splitting off the
/// trailing remainder as a new free block when it's large enough to stand on
/// its own (at least [`block::MIN_BLOCK_SIZE`] bytes).
///
/// `bp` must already have been removed from consideration by the caller in
/// the sense that its *pre-split* size is what selected its bucket; `place`
/// performs the actual unlink itself, using that original size, since the
/// header is about to be overwritten by the split.
///
/// # Safety
/// `bp` must be a legal, free block pointer currently linked into `buckets`
/// at the index its own (pre-split) size selects.
pub unsafe fn place(
  base: *mut u8,
  buckets: &mut Buckets,
  bp: *mut u8,
  asize: usize,
) {
  let csize = unsafe { block::size_of(bp) };
  let next_offset = unsafe { block::next_link(bp) };
  let prev_offset = unsafe { block::prev_link(bp) };
  unsafe { buckets.unlink(base, next_offset, prev_offset, csize) };

  if csize - asize >= block::MIN_BLOCK_SIZE {
    unsafe {
      block::write_block(bp, asize, true);
      let residue = block::next_block(bp);
      block::write_block(residue, csize - asize, false);
      buckets.push_head(base, residue);
    }
    log::trace!(
      "place: split block at offset {} into {asize} + {} bytes",
      block::to_offset(base, bp),
      csize - asize
    );
  } else {
    unsafe { block::write_block(bp, csize, true) };
    log::trace!(
      "place: block at offset {} placed whole ({csize} bytes, {} byte internal fragmentation)",
      block::to_offset(base, bp),
      csize - asize
    );
  }
}

/// Grows the region by at least `min_bytes`, rounded up to an even number of
/// words, and folds the new space into the free list via [`coalesce`].
///
/// Returns the (possibly merged) free block produced by the extension.
///
/// # Safety
/// `base` must be the region's prologue payload pointer, and the region must
/// currently end in a legal epilogue sentinel written by a previous call to
/// this function or by [`crate::heap::Heap::init`].
pub unsafe fn extend_heap<R: RegionProvider>(
  provider: &mut R,
  base: *mut u8,
  buckets: &mut Buckets,
  first_coalesce: &mut bool,
  min_bytes: usize,
) -> Result<*mut u8> {
  let words = min_bytes.div_ceil(block::WORD);
  let words = if words % 2 != 0 { words + 1 } else { words };
  let bytes = words * block::WORD;

  let bp = provider.extend(bytes)?;
  unsafe {
    block::write_block(bp, bytes, false);
    let epilogue = block::next_block(bp);
    block::write_epilogue(epilogue);
  }
  log::debug!("extend_heap: grew region by {bytes} bytes at offset {}", block::to_offset(base, bp));

  Ok(unsafe { coalesce(base, buckets, first_coalesce, bp) })
}
