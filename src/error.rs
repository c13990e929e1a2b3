//! Internal error types.
//!
//! The public facade ([`crate::heap::Heap`]) keeps the byte-oriented
//! malloc-shaped contract described by the specification: `allocate` returns
//! a null pointer on failure, `init` returns a status code. Those shapes are
//! deliberately not `Result`-based, since that's the external contract this
//! crate emulates. Internally, though, the region adapter and the allocation
//! policy propagate a typed error with `?` like any other Rust crate would,
//! and only the facade boundary collapses it back down to null/-1.

use std::fmt;

/// Failure modes reported by a [`crate::region::RegionProvider`].
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
  /// The provider refused to grow the region by the requested amount.
  #[error("region provider refused to extend by {requested} bytes")]
  OutOfMemory {
    /// The byte count that was requested and denied.
    requested: usize,
  },
  /// The provider failed for a reason beyond simple exhaustion (e.g. the
  /// underlying `sbrk(2)` call failed for an OS-reported reason).
  #[error("region provider failed to extend by {requested} bytes: {reason}")]
  ProviderFailure {
    /// The byte count that was requested.
    requested: usize,
    /// A short, provider-supplied description of the failure.
    reason: ProviderReason,
  },
}

/// Opaque, displayable reason carried by [`RegionError::ProviderFailure`].
///
/// Kept as a thin wrapper around a `String` rather than the raw `errno`
/// value so that non-libc providers (e.g. the in-memory test provider) can
/// report their own failure reasons without depending on `libc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReason(pub String);

impl fmt::Display for ProviderReason {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ProviderReason {
  fn from(s: &str) -> Self {
    ProviderReason(s.to_owned())
  }
}

impl From<String> for ProviderReason {
  fn from(s: String) -> Self {
    ProviderReason(s)
  }
}

/// Result alias used internally by the region adapter and allocation policy.
pub type Result<T> = std::result::Result<T, RegionError>;
