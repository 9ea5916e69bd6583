//! NgramCraft: n-gram frequency counting for payload anomaly detection.
//!
//! NgramCraft counts every overlapping byte n-gram of a payload, for a whole
//! range of lengths at once, so that a later payload can be scored against
//! what has been seen before. Two backends sit behind one interface:
//!
//! - **Counter arrays**: one `2^(8n)` table per length, indexed directly by
//!   the packed n-gram. Exact, but only practical for `n <= 4`.
//! - **Counting Bloom filters**: one filter per length, fed by a range hash
//!   that produces every length's hash at an offset in a single pass.
//!   Works for any length, with over-estimated counts.
//!
//! # Quick Start
//!
//! ```
//! use ngramcraft::core::BloomSizing;
//! use ngramcraft::{BackendKind, NgramConfig};
//!
//! let set = NgramConfig::builder()
//!     .backend(BackendKind::Bloom)
//!     .lengths(3, 5)
//!     .sizing(BloomSizing::Explicit { counters: 1 << 16, probes: 7 })
//!     .build()
//!     .unwrap()
//!     .create()
//!     .unwrap();
//!
//! let summary = set.add_item(b"GET /index.html HTTP/1.1");
//! assert_eq!(summary.ngrams, 22 + 21 + 20);
//!
//! assert!(set.find_ngram(b"GET").unwrap() >= 1);
//! assert!(set.find_item(b"index") > 0);
//! set.close();
//! ```
//!
//! # Counting Semantics
//!
//! For a buffer of `L` bytes and lengths `[min, max]`, an add visits exactly
//! `Σ (L - n + 1)` n-grams, one per window per length. Counters are 16 bits
//! and saturate at [`COUNTER_MAX`](crate::core::COUNTER_MAX); an increment past it
//! is reported as an overflow, a decrement of a saturated counter as an
//! underflow, and neither is an error. See [`UpdateSummary`].
//!
//! # Concurrency
//!
//! Every operation takes `&self`. A set built with
//! [`ConcurrencyMode::Shared`](crate::core::ConcurrencyMode::Shared) updates its
//! counters and tallies with relaxed compare-and-swap loops and can be fed
//! from several threads through an `Arc`:
//!
//! ```
//! use ngramcraft::core::{BloomSizing, ConcurrencyMode};
//! use ngramcraft::{NgramConfig, NgramFilterSet};
//! use std::sync::Arc;
//!
//! let set: Arc<dyn NgramFilterSet> = NgramConfig::builder()
//!     .lengths(2, 3)
//!     .sizing(BloomSizing::Explicit { counters: 1 << 12, probes: 4 })
//!     .mode(ConcurrencyMode::Shared)
//!     .build()
//!     .unwrap()
//!     .create()
//!     .unwrap()
//!     .into();
//!
//! std::thread::scope(|scope| {
//!     for _ in 0..4 {
//!         let set = Arc::clone(&set);
//!         scope.spawn(move || set.add_item(b"abcd"));
//!     }
//! });
//! assert_eq!(set.totals().total, 4 * (3 + 2));
//! ```
//!
//! # Features
//!
//! - `serde` (default) - Serialization of configuration, labels and reports
//! - `rayon` - Parallel statistics over very large counter tables

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_root_url = "https://docs.rs/ngramcraft/0.1.0")]

/// Counter tables, allocation, sizing and length ranges
pub mod core;

/// Error types and result aliases
pub mod error;

/// Backend implementations
pub mod filters;

/// Hash functions and probe strategies
pub mod hash;

/// The filter-set interface, backend selection and sessions
pub mod ngram;

/// Configuration builders
pub mod builder;

/// Distribution statistics
pub mod stats;

/// Utility functions and helpers
pub mod util;

// Re-export commonly used types at crate root
pub use error::{NgramError, Result};

pub use builder::{NgramConfig, NgramConfigBuilder, NgramSettings};
pub use crate::core::range::NgramRange;
pub use ngram::{
    BackendKind, FilterLabel, LengthReport, NgramFilterSet, NgramSession, UpdateSummary,
};

/// Prelude module for convenient imports.
///
/// # Examples
///
/// ```
/// use ngramcraft::prelude::*;
///
/// let set = NgramConfig::builder()
///     .backend(BackendKind::Array)
///     .lengths(1, 1)
///     .build()
///     .unwrap()
///     .create()
///     .unwrap();
/// set.add_item(b"hello");
/// assert_eq!(set.find_ngram(b"l").unwrap(), 2);
/// ```
pub mod prelude {
    pub use crate::builder::{NgramConfig, NgramConfigBuilder};
    pub use crate::core::{BloomSizing, ConcurrencyMode, CounterAllocator, NgramRange};
    pub use crate::error::{NgramError, Result};
    pub use crate::filters::{ArrayFilterSet, BloomFilterSet, CountingBloomFilter, Removal};
    pub use crate::hash::{Fnv1Hasher, NgramHasher};
    pub use crate::ngram::{BackendKind, NgramFilterSet, NgramSession, UpdateSummary};
}
