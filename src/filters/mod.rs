//! The counting backends.
//!
//! # Available Backends
//!
//! - [`ArrayFilterSet`] - Direct-indexed `2^(8n)` counter tables, exact up to saturation
//! - [`BloomFilterSet`] - One [`CountingBloomFilter`] per length, fed by range hashing
//!
//! # Choosing a Backend
//!
//! | Backend | Lengths | Memory per length | Counts |
//! |---------|---------|-------------------|--------|
//! | [`ArrayFilterSet`] | 1-4 | `2^(8n+1)` bytes | exact |
//! | [`BloomFilterSet`] | any | `2 × entries(n) × ratio` bytes | over-estimates |
//!
//! Both implement [`NgramFilterSet`](crate::ngram::NgramFilterSet); callers
//! normally reach them through [`NgramConfig`](crate::NgramConfig) rather than
//! by name.
//!
//! # Example
//!
//! ```
//! use ngramcraft::core::BloomSizing;
//! use ngramcraft::filters::{ArrayFilterSet, BloomFilterSet};
//! use ngramcraft::ngram::{BackendOptions, NgramFilterSet};
//! use ngramcraft::NgramRange;
//!
//! let options = BackendOptions {
//!     sizing: BloomSizing::Explicit { counters: 1 << 12, probes: 4 },
//!     ..BackendOptions::default()
//! };
//! let range = NgramRange::new(1, 2).unwrap();
//! let sets: Vec<Box<dyn NgramFilterSet>> = vec![
//!     Box::new(ArrayFilterSet::new(range, &options).unwrap()),
//!     Box::new(BloomFilterSet::new(range, &options).unwrap()),
//! ];
//! for set in &sets {
//!     set.add_item(b"abab");
//!     assert!(set.find_ngram(b"ab").unwrap() >= 2);
//! }
//! ```

pub mod array;
pub mod bloom_set;
pub mod counting;

pub use array::{ArrayFilterSet, ArrayNgramTable};
pub use bloom_set::BloomFilterSet;
pub use counting::{CountingBloomFilter, Removal};
