//! Alignment helpers shared by the block codec and the allocation policy.

/// Rounds `value` up to the nearest multiple of the machine word size.
///
/// # Examples
///
/// ```
/// use std::mem;
/// use segalloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + mem::size_of::<usize>() - 1) & !(mem::size_of::<usize>() - 1)
  };
}

/// Rounds `value` up to the nearest multiple of 8.
///
/// The block layout requires 8-byte alignment regardless of the host's native
/// word size (the header/footer pack the allocated bit into the low bit of a
/// size whose low three bits are otherwise always zero), so this is spelled
/// out explicitly rather than reusing [`align!`], which tracks `usize`'s
/// width instead.
pub const fn round_up_to_8(value: usize) -> usize {
  (value + 7) & !7
}
