//! Double-hashing probe sequences.
//!
//! For a hash split into lanes `(h, g)` and a table of `m` counters, probe `i`
//! lands on
//!
//! ```text
//! spotᵢ = (h + i·g) mod m        i = 0, 1, ..., k-1
//! ```
//!
//! [`ProbeSequence`] produces the same positions without a division per step:
//! both lanes are reduced modulo `m` once, then each step adds `g` and
//! subtracts `m` if the sum reached it. Since both terms are below `m`, one
//! subtraction is always enough. [`probe_index`] is the closed form, kept for
//! checking the incremental version.
//!
//! # References
//!
//! - Kirsch, A., & Mitzenmacher, M. (2006). "Less Hashing, Same Performance: Building a Better Bloom Filter"

#![allow(clippy::cast_possible_truncation)]

use crate::hash::hasher::Hash64;

/// Position of probe `i` for `hash` in a table of `m` counters.
///
/// # Panics
///
/// Panics if `m == 0`.
#[must_use]
#[inline]
pub fn probe_index(hash: Hash64, i: usize, m: usize) -> usize {
    let spot = u128::from(hash.h()) + (i as u128) * u128::from(hash.g());
    (spot % m as u128) as usize
}

/// Iterator over the `k` probe positions of one hash.
///
/// ```
/// use ngramcraft::hash::{Hash64, ProbeSequence};
///
/// let spots: Vec<usize> = ProbeSequence::new(Hash64::from_lanes(3, 4), 4, 10).collect();
/// assert_eq!(spots, vec![3, 7, 1, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    spot: u64,
    stride: u64,
    m: u64,
    remaining: usize,
}

impl ProbeSequence {
    /// Probes for `hash` in a table of `m` counters.
    ///
    /// # Panics
    ///
    /// Panics if `m == 0`.
    #[must_use]
    #[inline]
    pub fn new(hash: Hash64, probes: usize, m: usize) -> Self {
        let m = m as u64;
        Self {
            spot: u64::from(hash.h()) % m,
            stride: u64::from(hash.g()) % m,
            m,
            remaining: probes,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.spot;
        self.spot += self.stride;
        if self.spot >= self.m {
            self.spot -= self.m;
        }
        Some(current as usize)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ProbeSequence {}

impl std::iter::FusedIterator for ProbeSequence {}
