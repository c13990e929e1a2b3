//! Region adapter: the external collaborator that grows the backing store.
//!
//! The specification treats the region provider as out of scope for the
//! allocator core — it only needs to extend the region by a byte count and
//! report the current start/end. [`RegionProvider`] captures that contract;
//! [`SbrkRegion`] implements it over the real process heap via
//! `libc::sbrk`, the way the teacher crate's `BumpAllocator` does, and
//! [`BufferRegion`] implements it over a fixed-capacity in-memory buffer so
//! tests never have to touch (and fight each other over) the real process
//! break.

use crate::error::{ProviderReason, RegionError, Result};
use libc::{c_void, intptr_t, sbrk};
use std::ptr;

/// Supplies raw address-space growth to the allocator.
///
/// Out of scope for the allocator's own correctness: implementations only
/// need to hand back monotonically increasing memory and report where the
/// region currently starts and ends.
pub trait RegionProvider {
  /// Grows the region by `bytes`, returning the *old* end (the start of
  /// the newly available range). Returns [`RegionError`] if the region
  /// cannot be grown.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<*mut u8>;

  /// The fixed start of the region. Valid only after at least one
  /// successful [`RegionProvider::extend`] call.
  fn region_start(&self) -> *mut u8;

  /// The current end of the region (one past the last valid byte).
  fn region_end(&self) -> *mut u8;
}

/// A [`RegionProvider`] backed by the real process heap via `sbrk(2)`.
///
/// This is the production provider: every `extend` call moves the real
/// program break forward. Because `sbrk` is genuinely process-wide state,
/// at most one `SbrkRegion`-backed heap should be in use per process.
#[derive(Debug, Default)]
pub struct SbrkRegion {
  start: *mut u8,
  end: *mut u8,
}

impl SbrkRegion {
  /// Creates a provider with no region reserved yet; `region_start`
  /// returns null until the first successful `extend`.
  pub fn new() -> Self {
    Self {
      start: ptr::null_mut(),
      end: ptr::null_mut(),
    }
  }
}

impl RegionProvider for SbrkRegion {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<*mut u8> {
    let old_break = unsafe { sbrk(bytes as intptr_t) };
    if old_break == usize::MAX as *mut c_void {
      log::warn!("sbrk refused to extend by {bytes} bytes");
      return Err(RegionError::ProviderFailure {
        requested: bytes,
        reason: ProviderReason::from("sbrk returned (void*)-1"),
      });
    }

    let old_break = old_break as *mut u8;
    if self.start.is_null() {
      self.start = old_break;
    }
    self.end = unsafe { old_break.add(bytes) };
    log::debug!("sbrk extended region by {bytes} bytes, new end = {:p}", self.end);
    Ok(old_break)
  }

  fn region_start(&self) -> *mut u8 {
    self.start
  }

  fn region_end(&self) -> *mut u8 {
    self.end
  }
}

/// A [`RegionProvider`] backed by a fixed-capacity, heap-allocated buffer.
///
/// Used by the test suite: each test gets its own independent buffer, so
/// randomized property tests can run deterministically and in parallel
/// without any of them touching the real process break.
pub struct BufferRegion {
  // Backed by `u64` rather than `u8` purely so the allocator gets the
  // 8-byte-aligned start address every block pointer relies on; the
  // buffer is otherwise addressed byte-wise through `start`.
  storage: Vec<u64>,
  start: *mut u8,
  len: usize,
}

impl BufferRegion {
  /// Creates a provider backed by `capacity` bytes of storage. `extend`
  /// fails once the buffer's capacity is exhausted.
  pub fn with_capacity(capacity: usize) -> Self {
    let mut storage = vec![0u64; capacity.div_ceil(8)];
    let start = storage.as_mut_ptr().cast::<u8>();
    Self {
      storage,
      start,
      len: 0,
    }
  }
}

impl RegionProvider for BufferRegion {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<*mut u8> {
    if self.len + bytes > self.storage.len() * 8 {
      return Err(RegionError::OutOfMemory { requested: bytes });
    }
    let old_end = unsafe { self.start.add(self.len) };
    self.len += bytes;
    Ok(old_end)
  }

  fn region_start(&self) -> *mut u8 {
    self.start
  }

  fn region_end(&self) -> *mut u8 {
    unsafe { self.start.add(self.len) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buffer_region_extends_monotonically() {
    let mut region = BufferRegion::with_capacity(64);
    let first = region.extend(16).unwrap();
    let second = region.extend(16).unwrap();
    assert_eq!(unsafe { first.add(16) }, second);
    assert_eq!(region.region_start(), first);
    assert_eq!(region.region_end(), unsafe { second.add(16) });
  }

  #[test]
  fn buffer_region_fails_past_capacity() {
    let mut region = BufferRegion::with_capacity(32);
    assert!(region.extend(16).is_ok());
    assert!(region.extend(32).is_err());
  }
}
