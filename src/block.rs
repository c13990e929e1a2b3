//! Block-layout codec.
//!
//! Every function here is a direct translation of one of `mm.c`'s macros
//! (`PACK`, `GET`, `GET_SIZE`, `GET_ALLOC`, `HDRP`, `FTRP`, `NEXT_BLKP`,
//! `PREV_BLKP`, `CONVERTTOOFFSET`, `CONVERTFROMOFFSET`) into an `unsafe fn`
//! over a raw `*mut u8`. A block pointer `bp` always points at the start of
//! the block's *payload* — the header sits four bytes before it, matching
//! the classic malloc-lab convention this scheme is built on.
//!
//! None of the functions in this module validate that `bp` is actually a
//! legal block pointer; that's the checker's job (`crate::checker`). Given a
//! legal `bp`, every function here is total.

use std::ptr;

/// Size of a header or footer word, in bytes.
pub const WORD: usize = 4;
/// Size of a header+footer pair, in bytes.
pub const DWORD: usize = 8;
/// Smallest legal block size: header + two link words + footer.
pub const MIN_BLOCK_SIZE: usize = 16;
/// The low bit of a header/footer word marks the block allocated.
const ALLOC_BIT: u32 = 0x1;
const SIZE_MASK: u32 = !0x7;

#[inline]
unsafe fn header_ptr(bp: *mut u8) -> *mut u32 {
  unsafe { bp.sub(WORD).cast() }
}

#[inline]
unsafe fn footer_ptr(
  bp: *mut u8,
  size: usize,
) -> *mut u32 {
  unsafe { bp.add(size - DWORD).cast() }
}

/// Packs `size` and `allocated` into a single header/footer word.
#[inline]
pub const fn pack(
  size: usize,
  allocated: bool,
) -> u32 {
  size as u32 | (allocated as u32)
}

/// Reads the raw header word of block `bp`.
pub unsafe fn header(bp: *mut u8) -> u32 {
  unsafe { ptr::read(header_ptr(bp)) }
}

/// Reads the raw footer word of block `bp`.
pub unsafe fn footer(bp: *mut u8) -> u32 {
  unsafe { ptr::read(footer_ptr(bp, size_of(bp))) }
}

/// Decodes the total size (header + payload + footer) of block `bp`.
pub unsafe fn size_of(bp: *mut u8) -> usize {
  unsafe { (header(bp) & SIZE_MASK) as usize }
}

/// Decodes the payload size (total size minus header and footer) of `bp`.
pub unsafe fn payload_size_of(bp: *mut u8) -> usize {
  unsafe { size_of(bp) - DWORD }
}

/// Decodes the allocated bit of block `bp`.
pub unsafe fn is_allocated(bp: *mut u8) -> bool {
  unsafe { header(bp) & ALLOC_BIT != 0 }
}

/// Writes an identical header and footer, encoding `size` and `allocated`.
///
/// `size` must be at least [`DWORD`] (it always is, for any real block — the
/// epilogue sentinel is the sole exception and is written with
/// [`write_epilogue`] instead, since it has no footer at all).
pub unsafe fn write_block(
  bp: *mut u8,
  size: usize,
  allocated: bool,
) {
  let word = pack(size, allocated);
  unsafe {
    ptr::write(header_ptr(bp), word);
    ptr::write(footer_ptr(bp, size), word);
  }
}

/// Writes the epilogue sentinel: a header-only block of size 0, allocated,
/// terminating the region so [`next_block`] never walks past its end.
pub unsafe fn write_epilogue(bp: *mut u8) {
  unsafe { ptr::write(header_ptr(bp), pack(0, true)) }
}

/// Returns the block immediately following `bp`, per its own size.
///
/// For the last real block, this lands on the epilogue header.
pub unsafe fn next_block(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(size_of(bp)) }
}

/// Returns the block immediately preceding `bp`, by reading its footer.
///
/// For the first real block, this lands on the prologue block.
pub unsafe fn prev_block(bp: *mut u8) -> *mut u8 {
  unsafe {
    let prev_footer = bp.sub(DWORD).cast::<u32>();
    let prev_size = (ptr::read(prev_footer) & SIZE_MASK) as usize;
    bp.sub(prev_size)
  }
}

/// Converts an absolute block pointer to a 32-bit offset from `base`.
///
/// `p.is_null()` maps to offset `0`, the reserved null sentinel.
pub fn to_offset(
  base: *mut u8,
  p: *mut u8,
) -> u32 {
  if p.is_null() {
    0
  } else {
    (p as usize - base as usize) as u32
  }
}

/// Converts a 32-bit offset from `base` back to an absolute block pointer.
///
/// Offset `0` maps back to a null pointer.
pub fn from_offset(
  base: *mut u8,
  offset: u32,
) -> *mut u8 {
  if offset == 0 {
    ptr::null_mut()
  } else {
    unsafe { base.add(offset as usize) }
  }
}

/// Reads the `next` free-list link stored in the first four bytes of `bp`'s
/// payload. Only meaningful while `bp` is free.
pub unsafe fn next_link(bp: *mut u8) -> u32 {
  unsafe { ptr::read(bp.cast::<u32>()) }
}

/// Writes the `next` free-list link stored in the first four bytes of `bp`'s
/// payload. Only meaningful while `bp` is free.
pub unsafe fn set_next_link(
  bp: *mut u8,
  value: u32,
) {
  unsafe { ptr::write(bp.cast::<u32>(), value) }
}

/// Reads the `prev` free-list link stored in the second four bytes of `bp`'s
/// payload. Only meaningful while `bp` is free.
pub unsafe fn prev_link(bp: *mut u8) -> u32 {
  unsafe { ptr::read(bp.add(WORD).cast::<u32>()) }
}

/// Writes the `prev` free-list link stored in the second four bytes of `bp`'s
/// payload. Only meaningful while `bp` is free.
pub unsafe fn set_prev_link(
  bp: *mut u8,
  value: u32,
) {
  unsafe { ptr::write(bp.add(WORD).cast::<u32>(), value) }
}

#[cfg(test)]
mod tests {
  use super::*;

  // Backed by `u64` so the returned region starts 8-byte aligned, the way
  // every real region (process break, `BufferRegion`) does.
  fn alloc_region(len: usize) -> Vec<u64> {
    vec![0u64; len.div_ceil(8)]
  }

  #[test]
  fn write_and_read_roundtrip() {
    let mut region = alloc_region(64);
    let bp = unsafe { region.as_mut_ptr().cast::<u8>().add(8) };
    unsafe {
      write_block(bp, 32, false);
      assert_eq!(size_of(bp), 32);
      assert!(!is_allocated(bp));
      assert_eq!(header(bp), footer(bp));

      write_block(bp, 24, true);
      assert_eq!(size_of(bp), 24);
      assert!(is_allocated(bp));
    }
  }

  #[test]
  fn next_and_prev_block_are_inverse() {
    let mut region = alloc_region(96);
    let base = region.as_mut_ptr().cast::<u8>();
    let first = unsafe { base.add(8) };
    unsafe {
      write_block(first, 24, false);
      let second = next_block(first);
      write_block(second, 32, false);

      assert_eq!(prev_block(second), first);
      assert_eq!(next_block(first), second);
    }
  }

  #[test]
  fn offset_roundtrip_including_null() {
    let mut region = alloc_region(16);
    let base = region.as_mut_ptr().cast::<u8>();
    assert_eq!(to_offset(base, ptr::null_mut()), 0);
    assert!(from_offset(base, 0).is_null());

    let p = unsafe { base.add(8) };
    let offset = to_offset(base, p);
    assert_eq!(offset, 8);
    assert_eq!(from_offset(base, offset), p);
  }

  #[test]
  fn link_words_roundtrip() {
    let mut region = alloc_region(32);
    let bp = unsafe { region.as_mut_ptr().cast::<u8>().add(8) };
    unsafe {
      write_block(bp, 24, false);
      set_next_link(bp, 0xABCD);
      set_prev_link(bp, 0x1234);
      assert_eq!(next_link(bp), 0xABCD);
      assert_eq!(prev_link(bp), 0x1234);
    }
  }
}
