//! Heap consistency checker.
//!
//! A side-effect-free walk of the whole region plus every bucket, checking
//! the invariants the specification calls out by name. Never called on the
//! hot allocate/release path; exposed so embedders (and the test suite) can
//! run it after a sequence of operations to catch a violation close to its
//! cause rather than as a later segfault.

use crate::block;
use crate::buckets::{BUCKET_COUNT, Buckets, bucket_index};
use crate::region::RegionProvider;

/// Walks the region's blocks and buckets, logging (at `error` level) the
/// first invariant violation found, if any. Returns whether the heap is
/// consistent.
///
/// Checks, in order:
/// - I1: every block's header equals its footer.
/// - I6: every block pointer is 8-byte aligned.
/// - I3 (via the block walk): no two adjacent free blocks (would indicate a
///   missed coalesce).
/// - I5: every bucket's doubly linked list is consistent — walking forward
///   and reading each node's `prev` link points back at the node before it,
///   and the head's `prev` link is the null offset.
///
/// # Safety
/// `base` must be the region's prologue payload pointer and `region_end`
/// must be the current end of a region laid out by this crate (prologue,
/// zero or more real blocks, epilogue).
pub unsafe fn check<R: RegionProvider>(
  region: &R,
  base: *mut u8,
  buckets: &Buckets,
  verbose: bool,
) -> bool {
  if !unsafe { check_blocks(base, region.region_end(), verbose) } {
    return false;
  }
  unsafe { check_buckets(base, buckets, verbose) }
}

unsafe fn check_blocks(
  base: *mut u8,
  region_end: *mut u8,
  verbose: bool,
) -> bool {
  let mut bp = base;
  let mut prev_was_free = false;

  while (bp as usize) < region_end as usize {
    let size = unsafe { block::size_of(bp) };
    if size == 0 {
      break; // epilogue
    }

    if unsafe { block::header(bp) } != unsafe { block::footer(bp) } {
      log_violation(verbose, "I1", bp, "header does not match footer");
      return false;
    }

    if (bp as usize) % block::DWORD != 0 {
      log_violation(verbose, "I6", bp, "block pointer is not 8-byte aligned");
      return false;
    }

    let is_free = !unsafe { block::is_allocated(bp) };
    if is_free && prev_was_free {
      log_violation(verbose, "I3", bp, "adjacent to another free block");
      return false;
    }
    prev_was_free = is_free;

    bp = unsafe { block::next_block(bp) };
  }

  true
}

unsafe fn check_buckets(
  base: *mut u8,
  buckets: &Buckets,
  verbose: bool,
) -> bool {
  for index in 0..BUCKET_COUNT {
    let head = buckets.head(index);
    if head.is_null() {
      continue;
    }

    if unsafe { block::prev_link(head) } != 0 {
      log_violation(verbose, "I5", head, "bucket head's prev link is not null");
      return false;
    }

    let mut bp = head;
    loop {
      if unsafe { block::is_allocated(bp) } {
        log_violation(verbose, "I5", bp, "allocated block found in a free bucket");
        return false;
      }
      if bucket_index(unsafe { block::size_of(bp) }) != index {
        log_violation(verbose, "I5", bp, "block is linked into the wrong bucket");
        return false;
      }

      let next_offset = unsafe { block::next_link(bp) };
      if next_offset == 0 {
        break;
      }
      let next = unsafe { block::from_offset(base, next_offset) };
      if unsafe { block::prev_link(next) } != block::to_offset(base, bp) {
        log_violation(verbose, "I5", next, "prev link does not point back at predecessor");
        return false;
      }
      bp = next;
    }
  }

  true
}

fn log_violation(
  verbose: bool,
  invariant: &str,
  bp: *mut u8,
  detail: &str,
) {
  log::error!("heap check failed ({invariant}): {detail} at {:p}", bp);
  if verbose {
    eprintln!("heap check failed ({invariant}): {detail} at {:p}", bp);
  }
}
