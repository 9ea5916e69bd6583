//! Counting Bloom filter for one n-gram length.
//!
//! A counting Bloom filter replaces the bit array of a standard Bloom filter
//! with small counters, so items can be removed and their frequency
//! estimated.
//!
//! # Operations
//!
//! - Add: increment the `k` probed counters
//! - Delete: check that every probed counter is non-zero, then decrement them
//! - Find: the minimum of the `k` probed counters
//!
//! | Aspect | Cost | Notes |
//! |--------|------|-------|
//! | Add | O(k) | saturates at [`COUNTER_MAX`] |
//! | Find | O(k) | early exit on the first zero |
//! | Delete | O(2k) | refused without mutation if any probe is zero |
//!
//! The probes come from one 64-bit hash split into lanes `(h, g)`; see
//! [`ProbeSequence`].
//!
//! # Bookkeeping
//!
//! Each filter tracks `n` (items added minus items removed) and `d`
//! (estimated distinct items). An add counts toward `d` if any probed counter
//! was zero beforehand; a delete takes one off `d` if any probed counter
//! returned to zero. Collisions make `d` an undercount, and under
//! [`ConcurrencyMode::Shared`] the zero observation itself is racy.
//!
//! # Example
//!
//! ```
//! use ngramcraft::core::{BloomParams, ConcurrencyMode, HeapAllocator};
//! use ngramcraft::filters::{CountingBloomFilter, Removal};
//! use std::sync::Arc;
//!
//! let params = BloomParams { counters: 1000, probes: 4 };
//! let filter = CountingBloomFilter::new(3, params, Arc::new(HeapAllocator), ConcurrencyMode::Exclusive).unwrap();
//!
//! filter.add(b"cat");
//! filter.add(b"cat");
//! assert_eq!(filter.find(b"cat"), 2);
//!
//! assert_eq!(filter.delete(b"cat"), Removal::Removed { underflows: 0 });
//! assert_eq!(filter.find(b"cat"), 1);
//! ```
//!
//! # References
//!
//! - Fan, L., Cao, P., Almeida, J., & Broder, A. Z. (2000). "Summary cache: a scalable
//!   wide-area web cache sharing protocol". IEEE/ACM Transactions on Networking.

#![allow(clippy::module_name_repetitions)]

use crate::core::alloc::{AllocationRequest, CounterAllocator};
use crate::core::counter::{
    ConcurrencyMode, Counter, CounterTable, Decrement, Increment, Tally, TallySnapshot,
    COUNTER_MAX,
};
use crate::core::params::{BloomParams, BloomSizing};
use crate::error::Result;
use crate::hash::hasher::{Fnv1Hasher, Hash64, NgramHasher};
use crate::hash::strategies::ProbeSequence;
use crate::ngram::backend::BackendKind;
use crate::ngram::{LengthCounts, UpdateSummary, NGRAM_MAX};
use crate::stats::{self, DistributionStats};
use std::fmt;
use std::io;
use std::sync::Arc;

/// Outcome of deleting one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Every probed counter was non-zero and has been decremented, except
    /// `underflows` saturated ones that were left alone.
    Removed {
        /// Probed counters stuck at [`COUNTER_MAX`].
        underflows: u64,
    },
    /// At least one probed counter was zero; nothing was changed.
    NotFound,
}

impl Removal {
    /// True for [`Removal::Removed`].
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// Counting Bloom filter over `u16` saturating counters.
///
/// # Type Parameters
///
/// * `H` - Hash function (must implement [`NgramHasher`])
///
/// # Thread Safety
///
/// Every operation takes `&self`. With [`ConcurrencyMode::Shared`] counters
/// and tallies are updated with relaxed atomic read-modify-write operations,
/// so concurrent adds never lose an update.
pub struct CountingBloomFilter<H = Fnv1Hasher> {
    ngram: usize,
    probes: usize,
    counters: CounterTable,
    tally: Tally,
    hasher: H,
}

impl CountingBloomFilter<Fnv1Hasher> {
    /// Filter for `ngram`-grams hashed with FNV-1.
    ///
    /// # Errors
    ///
    /// [`NgramError::InvalidParameters`](crate::NgramError::InvalidParameters)
    /// for zero counters or a probe count outside `1..=64`, or the
    /// allocator's error.
    pub fn new(
        ngram: usize,
        params: BloomParams,
        allocator: Arc<dyn CounterAllocator>,
        mode: ConcurrencyMode,
    ) -> Result<Self> {
        Self::with_hasher(ngram, params, allocator, mode, Fnv1Hasher::new())
    }
}

impl<H: NgramHasher> CountingBloomFilter<H> {
    /// Filter for `ngram`-grams with a custom hasher.
    ///
    /// # Errors
    ///
    /// Same as [`CountingBloomFilter::new`].
    pub fn with_hasher(
        ngram: usize,
        params: BloomParams,
        allocator: Arc<dyn CounterAllocator>,
        mode: ConcurrencyMode,
        hasher: H,
    ) -> Result<Self> {
        BloomSizing::Explicit {
            counters: params.counters,
            probes: params.probes,
        }
        .validate()?;

        let request = AllocationRequest::new(BackendKind::Bloom, ngram, params.counters);
        Ok(Self {
            ngram,
            probes: params.probes,
            counters: CounterTable::allocate(allocator, request, mode)?,
            tally: Tally::new(),
            hasher,
        })
    }

    /// N-gram length this filter counts.
    #[must_use]
    #[inline]
    pub fn ngram(&self) -> usize {
        self.ngram
    }

    /// Number of counters (`m`).
    #[must_use]
    #[inline]
    pub fn size(&self) -> usize {
        self.counters.len()
    }

    /// Probes per item (`k`).
    #[must_use]
    #[inline]
    pub fn hash_count(&self) -> usize {
        self.probes
    }

    /// The hash function.
    #[must_use]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The counter table.
    #[must_use]
    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    /// Running `n`, `d` and event counts.
    #[must_use]
    pub fn tally(&self) -> TallySnapshot {
        self.tally.snapshot()
    }

    #[inline]
    fn mode(&self) -> ConcurrencyMode {
        self.counters.mode()
    }

    #[inline]
    fn probe(&self, hash: Hash64) -> ProbeSequence {
        ProbeSequence::new(hash, self.probes, self.counters.len())
    }

    /// Add an item by its precomputed hash. Returns the number of probed
    /// counters that were already saturated.
    pub fn add_hash(&self, hash: Hash64) -> u64 {
        let mut overflows = 0;
        let mut fresh = false;
        for spot in self.probe(hash) {
            match self.counters.increment(spot) {
                Increment::Fresh => fresh = true,
                Increment::Counted => {}
                Increment::Saturated => overflows += 1,
            }
        }

        let mode = self.mode();
        self.tally.record_added(1, mode);
        if fresh {
            self.tally.record_distinct(1, mode);
        }
        self.tally.record_overflows(overflows, mode);
        overflows
    }

    /// Add one item. Returns the number of overflowed probes.
    #[inline]
    pub fn add(&self, item: &[u8]) -> u64 {
        self.add_hash(self.hasher.hash(item))
    }

    /// Delete an item by its precomputed hash.
    pub fn delete_hash(&self, hash: Hash64) -> Removal {
        let mode = self.mode();
        if self.probe(hash).any(|spot| self.counters.get(spot) == 0) {
            self.tally.record_not_found(1, mode);
            return Removal::NotFound;
        }

        let mut underflows = 0;
        let mut emptied = false;
        for spot in self.probe(hash) {
            match self.counters.decrement(spot) {
                Decrement::Emptied => emptied = true,
                Decrement::Saturated => underflows += 1,
                Decrement::Counted | Decrement::Absent => {}
            }
        }

        self.tally.record_removed(1, mode);
        if emptied {
            self.tally.record_vanished(1, mode);
        }
        self.tally.record_underflows(underflows, mode);
        Removal::Removed { underflows }
    }

    /// Delete one item.
    #[inline]
    pub fn delete(&self, item: &[u8]) -> Removal {
        self.delete_hash(self.hasher.hash(item))
    }

    /// Estimated frequency of an item by its precomputed hash.
    #[must_use]
    pub fn find_hash(&self, hash: Hash64) -> Counter {
        let mut least = COUNTER_MAX;
        for spot in self.probe(hash) {
            let count = self.counters.get(spot);
            if count == 0 {
                return 0;
            }
            least = least.min(count);
        }
        least
    }

    /// Estimated frequency of one item; `0` means definitely absent.
    #[must_use]
    #[inline]
    pub fn find(&self, item: &[u8]) -> Counter {
        self.find_hash(self.hasher.hash(item))
    }

    /// Add every `ngram`-byte window of `item`.
    pub fn add_over_item(&self, item: &[u8]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        for window in item.windows(self.ngram) {
            summary.ngrams += 1;
            summary.overflows += self.add(window);
        }
        summary
    }

    /// Delete every `ngram`-byte window of `item`.
    pub fn delete_over_item(&self, item: &[u8]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        for window in item.windows(self.ngram) {
            summary.ngrams += 1;
            match self.delete(window) {
                Removal::Removed { underflows } => summary.underflows += underflows,
                Removal::NotFound => summary.not_found += 1,
            }
        }
        summary
    }

    /// Summed frequency of every `ngram`-byte window of `item`.
    #[must_use]
    pub fn find_over_item(&self, item: &[u8]) -> u64 {
        item.windows(self.ngram)
            .map(|window| u64::from(self.find(window)))
            .sum()
    }

    /// Frequencies of `item`'s first [`NGRAM_MAX`] windows, in order.
    #[must_use]
    pub fn frequencies(&self, item: &[u8]) -> Vec<u64> {
        item.windows(self.ngram)
            .take(NGRAM_MAX)
            .map(|window| u64::from(self.find(window)))
            .collect()
    }

    /// Statistics of the raw counter table.
    #[must_use]
    pub fn distribution(&self) -> DistributionStats {
        stats::summarize(self.counters.cells())
    }

    /// Size and running counts.
    #[must_use]
    pub fn counts(&self) -> LengthCounts {
        LengthCounts {
            ngram: self.ngram,
            counters: self.counters.len(),
            bytes: self.counters.memory_usage(),
            tally: self.tally(),
        }
    }

    /// Write the filter header and, at verbosity 1 and up, every occupied
    /// counter as `index count`.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn dump(&self, out: &mut dyn io::Write, verbosity: u8) -> io::Result<()> {
        let tally = self.tally();
        writeln!(
            out,
            "bloom ngram {}: m {} k {} n {} d {} overflows {} underflows {}",
            self.ngram,
            self.size(),
            self.probes,
            tally.total,
            tally.distinct,
            tally.overflows,
            tally.underflows
        )?;
        if verbosity >= 1 {
            for (index, count) in self.counters.occupied() {
                writeln!(out, "{index} {count}")?;
            }
        }
        Ok(())
    }
}

impl<H: NgramHasher> fmt::Debug for CountingBloomFilter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingBloomFilter")
            .field("ngram", &self.ngram)
            .field("m", &self.counters.len())
            .field("k", &self.probes)
            .field("mode", &self.counters.mode())
            .field("hasher", &self.hasher.name())
            .field("tally", &self.tally.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alloc::{BoundedAllocator, HeapAllocator};
    use crate::error::NgramError;

    fn filter(m: usize, k: usize) -> CountingBloomFilter {
        filter_in(m, k, ConcurrencyMode::Exclusive)
    }

    fn filter_in(m: usize, k: usize, mode: ConcurrencyMode) -> CountingBloomFilter {
        CountingBloomFilter::new(
            3,
            BloomParams {
                counters: m,
                probes: k,
            },
            Arc::new(HeapAllocator),
            mode,
        )
        .unwrap()
    }

    #[test]
    fn test_new_filter() {
        let f = filter(1000, 4);
        assert_eq!(f.size(), 1000);
        assert_eq!(f.hash_count(), 4);
        assert_eq!(f.ngram(), 3);
        assert_eq!(f.counters().count_nonzero(), 0);
        assert_eq!(f.tally(), TallySnapshot::default());
    }

    #[test]
    fn test_invalid_params() {
        let bad = |counters, probes| {
            CountingBloomFilter::new(
                3,
                BloomParams { counters, probes },
                Arc::new(HeapAllocator),
                ConcurrencyMode::Exclusive,
            )
            .unwrap_err()
        };
        assert!(matches!(bad(0, 4), NgramError::InvalidParameters { .. }));
        assert!(matches!(bad(100, 0), NgramError::InvalidParameters { .. }));
        assert!(matches!(bad(100, 65), NgramError::InvalidParameters { .. }));
    }

    #[test]
    fn test_add_then_find() {
        let f = filter(1000, 4);
        f.add(b"cat");
        assert!(f.find(b"cat") >= 1);
        let tally = f.tally();
        assert_eq!(tally.total, 1);
        assert_eq!(tally.distinct, 1);
    }

    #[test]
    fn test_find_absent_when_probes_disjoint() {
        let f = filter(1000, 4);
        f.add(b"cat");
        let hasher = Fnv1Hasher::new();
        let cat: Vec<usize> = ProbeSequence::new(hasher.hash(b"cat"), 4, 1000).collect();
        let dog: Vec<usize> = ProbeSequence::new(hasher.hash(b"dog"), 4, 1000).collect();
        if dog.iter().all(|spot| !cat.contains(spot)) {
            assert_eq!(f.find(b"dog"), 0);
        }
    }

    #[test]
    fn test_find_is_minimum() {
        let f = filter(1 << 16, 5);
        for _ in 0..3 {
            f.add(b"abc");
        }
        assert_eq!(f.find(b"abc"), 3);
    }

    #[test]
    fn test_repeat_add_not_distinct() {
        let f = filter(1 << 12, 4);
        f.add(b"xyz");
        f.add(b"xyz");
        let tally = f.tally();
        assert_eq!(tally.total, 2);
        assert_eq!(tally.distinct, 1);
    }

    #[test]
    fn test_delete_absent_refused() {
        let f = filter(1000, 4);
        f.add(b"cat");
        let before: Vec<Counter> = f.counters().values().collect();
        if f.find(b"dog") == 0 {
            assert_eq!(f.delete(b"dog"), Removal::NotFound);
            let after: Vec<Counter> = f.counters().values().collect();
            assert_eq!(before, after);
            assert_eq!(f.tally().not_found, 1);
            assert_eq!(f.tally().total, 1);
        }
    }

    #[test]
    fn test_delete_restores_zero() {
        let f = filter(1 << 12, 6);
        f.add(b"abc");
        assert_eq!(f.delete(b"abc"), Removal::Removed { underflows: 0 });
        assert_eq!(f.find(b"abc"), 0);
        assert_eq!(f.counters().count_nonzero(), 0);
        let tally = f.tally();
        assert_eq!(tally.total, 0);
        assert_eq!(tally.distinct, 0);
    }

    #[test]
    fn test_saturation_single_position() {
        // One probe into one counter: every add hits the same cell.
        let f = filter(1, 1);
        let mut overflows = 0;
        for _ in 0..=u32::from(COUNTER_MAX) {
            overflows += f.add(b"same");
        }
        assert_eq!(f.counters().get(0), COUNTER_MAX);
        assert_eq!(overflows, 1);
        assert_eq!(f.tally().overflows, 1);
        assert_eq!(f.find(b"same"), COUNTER_MAX);
    }

    #[test]
    fn test_delete_saturated_is_underflow() {
        let f = filter(1, 1);
        for _ in 0..COUNTER_MAX {
            f.add(b"same");
        }
        assert_eq!(f.delete(b"same"), Removal::Removed { underflows: 1 });
        assert_eq!(f.counters().get(0), COUNTER_MAX);
        assert_eq!(f.tally().underflows, 1);
    }

    #[test]
    fn test_over_item_operations() {
        let f = filter(1 << 14, 4);
        let summary = f.add_over_item(b"abcabc");
        assert_eq!(summary.ngrams, 4);
        assert_eq!(summary.overflows, 0);
        assert!(f.find(b"abc") >= 2);
        assert!(f.find_over_item(b"abcabc") >= 4);
        assert_eq!(f.frequencies(b"abca").len(), 2);
        assert_eq!(f.add_over_item(b"ab").ngrams, 0);

        let removed = f.delete_over_item(b"abcabc");
        assert_eq!(removed.ngrams, 4);
        assert_eq!(removed.not_found, 0);
        assert_eq!(f.counters().count_nonzero(), 0);
    }

    #[test]
    fn test_distribution_total() {
        let f = filter(256, 3);
        f.add(b"one");
        f.add(b"two");
        let dist = f.distribution();
        assert_eq!(dist.cells, 256);
        assert_eq!(dist.total, 6);
        assert!(dist.chi_square.is_some());
    }

    #[test]
    fn test_dump() {
        let f = filter(64, 2);
        f.add(b"abc");
        let mut out = Vec::new();
        f.dump(&mut out, 0).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "bloom ngram 3: m 64 k 2 n 1 d 1 overflows 0 underflows 0\n"
        );

        let mut out = Vec::new();
        f.dump(&mut out, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        let occupied = f.counters().count_nonzero();
        assert_eq!(text.lines().count(), 1 + occupied);
    }

    #[test]
    fn test_shared_concurrent_adds() {
        let f = filter_in(1 << 10, 4, ConcurrencyMode::Shared);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        f.add(b"pkt");
                    }
                });
            }
        });
        assert_eq!(f.tally().total, 2000);
        assert_eq!(f.find(b"pkt"), 2000);
    }

    #[test]
    fn test_storage_released_to_allocator() {
        let allocator = Arc::new(BoundedAllocator::new(4096));
        {
            let _f = CountingBloomFilter::new(
                3,
                BloomParams {
                    counters: 1024,
                    probes: 3,
                },
                allocator.clone(),
                ConcurrencyMode::Exclusive,
            )
            .unwrap();
            assert_eq!(allocator.usage().in_use, 2048);
        }
        assert_eq!(allocator.usage().in_use, 0);
    }
}
