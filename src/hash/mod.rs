//! Hashing for the Bloom backend.
//!
//! # Module Structure
//!
//! ```text
//! hash/
//! ├── fnv.rs         - FNV-1 64-bit, single length and incremental range
//! ├── hasher.rs      - NgramHasher trait, Hash64 lanes, Fnv1Hasher
//! ├── strategies.rs  - Double-hashing probe sequences
//! └── mod.rs         - This file (public API)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use ngramcraft::hash::{Fnv1Hasher, NgramHasher, ProbeSequence};
//!
//! let hash = Fnv1Hasher::new().hash(b"cat");
//! let spots: Vec<usize> = ProbeSequence::new(hash, 4, 1000).collect();
//! assert_eq!(spots.len(), 4);
//! assert!(spots.iter().all(|&spot| spot < 1000));
//! ```

pub mod fnv;
pub mod hasher;
pub mod strategies;

pub use fnv::{fnv1_64, fnv1_64_range, fnv1_64_str, fnv1_64_str_range, FNV1_64_INIT};
pub use hasher::{Fnv1Hasher, Hash64, NgramHasher};
pub use strategies::{probe_index, ProbeSequence};
