//! Core building blocks shared by every backend.
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── counter.rs   - Saturating counter tables, tallies, concurrency mode
//! ├── alloc.rs     - Injected counter storage allocation
//! ├── params.rs    - Bloom and array table sizing
//! ├── range.rs     - Validated n-gram length range
//! └── mod.rs       - This file (public API)
//! ```
//!
//! Nothing in here knows about n-grams beyond their length: the backends in
//! [`filters`](crate::filters) combine these pieces with hashing and
//! windowing.

pub mod alloc;
pub mod counter;
pub mod params;
pub mod range;

pub use alloc::{AllocationRequest, AllocatorUsage, BoundedAllocator, CounterAllocator, HeapAllocator};
pub use counter::{
    ConcurrencyMode, Counter, CounterTable, Decrement, Increment, Tally, TallySnapshot,
    COUNTER_MAX,
};
pub use params::{BloomParams, BloomSizing, ARRAY_MAX_NGRAM};
pub use range::NgramRange;
