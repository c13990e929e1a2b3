//! # segalloc - A segregated free-list dynamic storage allocator
//!
//! This crate provides a drop-in `malloc`/`free`/`realloc`/`calloc`
//! replacement backed by a single, monotonically growable region and a
//! segregated-size-class free list with boundary-tag coalescing — the
//! classic CS:APP malloc-lab design, packaged as an owned Rust value instead
//! of a set of global C functions.
//!
//! ## Overview
//!
//! ```text
//!   Region layout:
//!
//!   ┌─────┬───────────┬───────────┬─────┬───────┬──────────┐
//!   │ pad │ prologue   │  block 1  │ ... │ blk N │ epilogue │
//!   │ 4B  │ (8B, alloc)│           │     │       │ (0B, alloc)
//!   └─────┴───────────┴───────────┴─────┴───────┴──────────┘
//! ```
//!
//! Every real block carries a 4-byte header and footer encoding its total
//! size and allocated bit ([`block`]); while free, its payload also carries
//! the `next`/`prev` links of its segregated free list ([`buckets`]).
//! Coalescing ([`coalesce`]) merges a freed block with any free neighbours
//! using the classic four-case boundary-tag walk. Growing the region and
//! placing an allocation into a found block are the allocation policy
//! ([`policy`]); the whole thing is exposed through [`Heap`], a value
//! generic over how the region itself is grown ([`RegionProvider`]).
//!
//! ## Crate structure
//!
//! ```text
//!   segalloc
//!   ├── align    - alignment helpers
//!   ├── error    - RegionError / Result
//!   ├── config   - Config (region-growth tuning)
//!   ├── block    - block-layout codec (header/footer, links, offsets)
//!   ├── buckets  - segregated free-list index
//!   ├── coalesce - boundary-tag coalescer
//!   ├── region   - RegionProvider, SbrkRegion, BufferRegion
//!   ├── policy   - find_fit / place / extend_heap
//!   ├── checker  - heap consistency checker
//!   └── heap     - the public Heap<R> facade
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use segalloc::{Heap, SbrkRegion};
//!
//! let mut heap = Heap::new(SbrkRegion::new());
//! assert_eq!(heap.init(), 0);
//!
//! let ptr = heap.allocate(128);
//! assert!(!ptr.is_null());
//! heap.release(ptr);
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` has no internal synchronization; it is
//!   not `Sync`, and no `GlobalAlloc` impl is provided.
//! - **Never returns memory to the OS**: the region only grows; freed blocks
//!   are recycled, never shrunk back via `sbrk`.
//! - **32-bit offsets**: a single region cannot exceed 4 GiB.
//!
//! ## Safety
//!
//! This crate manages raw memory directly. Every function below the
//! [`Heap`] facade is `unsafe` and trusts its caller to pass legal block
//! pointers; [`checker::check`] exists specifically to catch a violation of
//! that trust early, at the cost of a full heap walk.

pub mod align;
pub mod block;
pub mod buckets;
pub mod checker;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod heap;
pub mod policy;
pub mod region;

pub use config::Config;
pub use error::RegionError;
pub use heap::Heap;
pub use region::{BufferRegion, RegionProvider, SbrkRegion};
