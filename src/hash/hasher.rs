//! The hashing seam used by the Bloom backend.
//!
//! A Bloom filter needs a whole family of hash functions. Rather than compute
//! `k` independent hashes, one 64-bit hash is split into two 32-bit lanes
//! `(h, g)` and the family is `h + i·g` (see
//! [`ProbeSequence`](crate::hash::strategies::ProbeSequence)). Any
//! [`NgramHasher`] can drive the backend; [`Fnv1Hasher`] is the default
//! because FNV-1 extends one byte at a time, which makes the range variant a
//! single pass.

#![allow(clippy::module_name_repetitions)]

use crate::hash::fnv::{fnv1_64, fnv1_64_range_into, FNV1_64_INIT};
use std::fmt;

/// A 64-bit hash viewed as two independent 32-bit lanes.
///
/// ```
/// use ngramcraft::hash::Hash64;
///
/// let hash = Hash64::new(0x0000_0002_0000_0001);
/// assert_eq!(hash.h(), 1);
/// assert_eq!(hash.g(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Hash64(u64);

impl Hash64 {
    /// Wrap a raw 64-bit hash.
    #[must_use]
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Build from explicit lanes.
    #[must_use]
    #[inline]
    pub const fn from_lanes(h: u32, g: u32) -> Self {
        Self(((g as u64) << 32) | h as u64)
    }

    /// The raw value.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Low lane: the first probe position before reduction.
    #[must_use]
    #[inline]
    pub const fn h(self) -> u32 {
        self.0 as u32
    }

    /// High lane: the stride between probes before reduction.
    #[must_use]
    #[inline]
    pub const fn g(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl From<u64> for Hash64 {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::LowerHex for Hash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Hash function driving the Bloom backend.
///
/// `hash_range_into` must agree exactly with `hash` applied to every
/// truncation `item[..n]` for `n` in `[low, high]`; the default implementation
/// does just that, one length at a time.
pub trait NgramHasher: Send + Sync {
    /// Hash one item.
    fn hash(&self, item: &[u8]) -> Hash64;

    /// Hash every prefix of `buf` with length in `[low, high]` (clamped to
    /// `buf.len()`) into `out`, which is cleared first. Returns the count.
    ///
    /// When `low` exceeds the clamped `high`, `out` holds only the hash of the
    /// empty prefix.
    fn hash_range_into(&self, buf: &[u8], low: usize, high: usize, out: &mut Vec<u64>) -> usize {
        out.clear();
        let high = high.min(buf.len());
        if low > high {
            out.push(self.hash(&[]).raw());
            return 1;
        }
        out.extend((low..=high).map(|n| self.hash(&buf[..n]).raw()));
        out.len()
    }

    /// Short name for labels and logs.
    fn name(&self) -> &'static str;
}

/// FNV-1 64-bit hasher with a configurable basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1Hasher {
    basis: u64,
}

impl Fnv1Hasher {
    /// Hasher starting from the standard FNV-1 offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            basis: FNV1_64_INIT,
        }
    }

    /// Hasher starting from a custom basis, e.g. a previous hash to chain from.
    #[must_use]
    pub const fn with_basis(basis: u64) -> Self {
        Self { basis }
    }

    /// The starting basis.
    #[must_use]
    pub const fn basis(&self) -> u64 {
        self.basis
    }
}

impl Default for Fnv1Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl NgramHasher for Fnv1Hasher {
    #[inline]
    fn hash(&self, item: &[u8]) -> Hash64 {
        Hash64(fnv1_64(item, self.basis))
    }

    #[inline]
    fn hash_range_into(&self, buf: &[u8], low: usize, high: usize, out: &mut Vec<u64>) -> usize {
        fnv1_64_range_into(buf, low, high, self.basis, out)
    }

    fn name(&self) -> &'static str {
        "fnv1-64"
    }
}
