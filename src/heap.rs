//! Public facade.
//!
//! [`Heap`] owns everything the allocator needs — the region provider, the
//! region's base pointer, the segregated bucket index, and the first-call
//! flag the coalescer needs — as a plain value, rather than the
//! process-wide globals a C malloc implementation is stuck with. Its methods
//! are the only place the internal `Result`-based error type is collapsed
//! back down to the null-pointer/status-code contract a drop-in allocator is
//! expected to have.

use crate::block;
use crate::buckets::Buckets;
use crate::checker;
use crate::config::Config;
use crate::coalesce::coalesce;
use crate::policy::{extend_heap, find_fit, place};
use crate::region::RegionProvider;
use std::ptr;

/// A segregated free-list allocator over a single, monotonically growable
/// region supplied by `R`.
///
/// Not `Sync`: every method takes `&mut self`, and nothing here coordinates
/// concurrent callers. Wrap a `Heap` in whatever synchronization its
/// embedder's concurrency model calls for.
pub struct Heap<R: RegionProvider> {
  provider: R,
  base: *mut u8,
  buckets: Buckets,
  first_coalesce: bool,
  config: Config,
}

impl<R: RegionProvider> Heap<R> {
  /// Creates an uninitialized heap with default [`Config`]. Call
  /// [`Heap::init`] before any allocation.
  pub fn new(provider: R) -> Self {
    Self::with_config(provider, Config::default())
  }

  /// Creates an uninitialized heap with a caller-supplied [`Config`].
  pub fn with_config(
    provider: R,
    config: Config,
  ) -> Self {
    Self {
      provider,
      base: ptr::null_mut(),
      buckets: Buckets::new(),
      first_coalesce: true,
      config,
    }
  }

  /// Lays down the prologue and epilogue sentinels and performs the
  /// initial region extension. Must be called exactly once before any
  /// other method. Returns `0` on success, `-1` on failure (region
  /// provider refused to extend), matching the conventional malloc-lab
  /// `mm_init` contract.
  pub fn init(&mut self) -> i32 {
    self.buckets = Buckets::new();
    self.first_coalesce = true;

    // Reserves 16 bytes: a 4-byte alignment pad, the 8-byte allocated
    // prologue block, and the epilogue's 4-byte header.
    let raw = match self.provider.extend(2 * block::DWORD) {
      Ok(raw) => raw,
      Err(err) => {
        log::error!("Heap::init: failed to reserve prologue/epilogue: {err}");
        return -1;
      }
    };

    let base = unsafe { raw.add(block::DWORD) };
    unsafe {
      block::write_block(base, block::DWORD, true);
      block::write_epilogue(block::next_block(base));
    }
    self.base = base;
    log::debug!("Heap::init: region initialized, base at offset 0");

    match unsafe {
      extend_heap(
        &mut self.provider,
        self.base,
        &mut self.buckets,
        &mut self.first_coalesce,
        self.config.initial_extend_bytes,
      )
    } {
      Ok(_) => 0,
      Err(err) => {
        log::error!("Heap::init: initial region extension failed: {err}");
        -1
      }
    }
  }

  /// Allocates a block of at least `size` bytes, 8-byte aligned, returning
  /// a null pointer if `size` is zero or the region cannot be grown far
  /// enough to satisfy the request.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let asize = Self::adjusted_size(size);

    let mut bp = unsafe { find_fit(&self.buckets, self.base, asize) };
    if bp.is_null() {
      let extend_size = asize.max(self.config.min_extend_bytes);
      bp = match unsafe {
        extend_heap(
          &mut self.provider,
          self.base,
          &mut self.buckets,
          &mut self.first_coalesce,
          extend_size,
        )
      } {
        Ok(bp) => bp,
        Err(err) => {
          log::warn!("Heap::allocate: region extension for {size} bytes failed: {err}");
          return ptr::null_mut();
        }
      };
      if unsafe { block::size_of(bp) } < asize {
        log::error!("Heap::allocate: extended region still too small for {asize} bytes");
        return ptr::null_mut();
      }
    }

    unsafe { place(self.base, &mut self.buckets, bp, asize) };
    log::trace!("Heap::allocate: {size} bytes -> offset {}", block::to_offset(self.base, bp));
    bp
  }

  /// Releases a block previously returned by [`Heap::allocate`],
  /// [`Heap::resize`], or [`Heap::zero_allocate`]. Passing a null pointer
  /// is a no-op, matching `free(NULL)`.
  pub fn release(
    &mut self,
    bp: *mut u8,
  ) {
    if bp.is_null() {
      return;
    }

    let size = unsafe { block::size_of(bp) };
    unsafe { block::write_block(bp, size, false) };
    unsafe { coalesce(self.base, &mut self.buckets, &mut self.first_coalesce, bp) };
    log::trace!("Heap::release: offset {}", block::to_offset(self.base, bp));
  }

  /// Resizes the allocation at `bp`, preserving its contents up to the
  /// smaller of the old and new sizes. `bp` null behaves like `allocate`;
  /// `new_size` zero behaves like `release` and returns null.
  pub fn resize(
    &mut self,
    bp: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    if bp.is_null() {
      return self.allocate(new_size);
    }
    if new_size == 0 {
      self.release(bp);
      return ptr::null_mut();
    }

    let old_payload = unsafe { block::payload_size_of(bp) };
    let new_bp = self.allocate(new_size);
    if new_bp.is_null() {
      return ptr::null_mut();
    }

    let copy_len = old_payload.min(new_size);
    unsafe { ptr::copy_nonoverlapping(bp, new_bp, copy_len) };
    self.release(bp);
    new_bp
  }

  /// Allocates space for `nmemb` elements of `size` bytes each, zeroed,
  /// matching `calloc`. Returns null (without allocating) on size
  /// overflow, matching glibc's documented overflow behaviour.
  pub fn zero_allocate(
    &mut self,
    nmemb: usize,
    size: usize,
  ) -> *mut u8 {
    let total = match nmemb.checked_mul(size) {
      Some(total) => total,
      None => {
        log::warn!("Heap::zero_allocate: {nmemb} * {size} overflows");
        return ptr::null_mut();
      }
    };

    let bp = self.allocate(total);
    if !bp.is_null() {
      unsafe { ptr::write_bytes(bp, 0, total) };
    }
    bp
  }

  /// Runs the consistency checker over the whole region and every bucket.
  /// See [`crate::checker::check`] for exactly what's verified.
  pub fn check(
    &self,
    verbose: bool,
  ) -> bool {
    unsafe { checker::check(&self.provider, self.base, &self.buckets, verbose) }
  }

  /// Rounds a requested payload size up to a legal block size: room for
  /// header, footer, and (while free) the two free-list link words, 8-byte
  /// aligned, and never below [`block::MIN_BLOCK_SIZE`].
  fn adjusted_size(size: usize) -> usize {
    let with_overhead = size + block::DWORD;
    crate::align::round_up_to_8(with_overhead).max(block::MIN_BLOCK_SIZE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::BufferRegion;

  fn init_heap(capacity: usize) -> Heap<BufferRegion> {
    let mut heap = Heap::new(BufferRegion::with_capacity(capacity));
    assert_eq!(heap.init(), 0);
    heap
  }

  #[test]
  fn allocate_returns_aligned_nonnull_pointer() {
    let mut heap = init_heap(4096);
    let bp = heap.allocate(40);
    assert!(!bp.is_null());
    assert_eq!((bp as usize) % block::DWORD, 0);
    assert!(heap.check(false));
  }

  #[test]
  fn allocate_zero_returns_null() {
    let mut heap = init_heap(4096);
    assert!(heap.allocate(0).is_null());
  }

  #[test]
  fn release_then_allocate_reuses_freed_space() {
    let mut heap = init_heap(4096);
    let a = heap.allocate(64);
    heap.release(a);
    let b = heap.allocate(64);
    assert_eq!(a, b);
    assert!(heap.check(false));
  }

  #[test]
  fn resize_preserves_contents() {
    let mut heap = init_heap(4096);
    let bp = heap.allocate(16);
    unsafe { ptr::write_bytes(bp, 0xAB, 16) };

    let grown = heap.resize(bp, 256);
    assert!(!grown.is_null());
    let bytes = unsafe { std::slice::from_raw_parts(grown, 16) };
    assert!(bytes.iter().all(|&b| b == 0xAB));
    assert!(heap.check(false));
  }

  #[test]
  fn resize_to_zero_releases_and_returns_null() {
    let mut heap = init_heap(4096);
    let bp = heap.allocate(32);
    assert!(heap.resize(bp, 0).is_null());
    assert!(heap.check(false));
  }

  #[test]
  fn resize_null_behaves_like_allocate() {
    let mut heap = init_heap(4096);
    let bp = heap.resize(ptr::null_mut(), 32);
    assert!(!bp.is_null());
  }

  #[test]
  fn zero_allocate_zeroes_memory() {
    let mut heap = init_heap(4096);
    let bp = heap.allocate(64);
    unsafe { ptr::write_bytes(bp, 0xFF, 64) };
    heap.release(bp);

    let zeroed = heap.zero_allocate(8, 8);
    assert!(!zeroed.is_null());
    let bytes = unsafe { std::slice::from_raw_parts(zeroed, 64) };
    assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn zero_allocate_overflow_returns_null() {
    let mut heap = init_heap(4096);
    assert!(heap.zero_allocate(usize::MAX, 2).is_null());
  }

  #[test]
  fn release_of_null_is_noop() {
    let mut heap = init_heap(4096);
    heap.release(ptr::null_mut());
    assert!(heap.check(false));
  }

  #[test]
  fn allocating_past_region_capacity_returns_null() {
    let mut heap = init_heap(1200);
    let mut last = ptr::null_mut();
    for _ in 0..64 {
      let bp = heap.allocate(64);
      if bp.is_null() {
        break;
      }
      last = bp;
    }
    assert!(!last.is_null());
    assert!(heap.allocate(usize::MAX / 2).is_null());
  }
}
