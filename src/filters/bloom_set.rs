//! Counting Bloom filters for a range of n-gram lengths.
//!
//! [`BloomFilterSet`] keeps one [`CountingBloomFilter`] per length and walks a
//! buffer with a [`WindowPlan`]. At each offset a single range-hash pass
//! yields the hashes of every length the offset contributes, and each hash
//! goes straight to its length's filter:
//!
//! ```text
//! offset i, span [a, b]
//!   hash_range_into(buf[i..], a, b) → [H(a), H(a+1), ..., H(b)]
//!   filter[a].add_hash(H(a)), ..., filter[b].add_hash(H(b))
//! ```
//!
//! Because FNV-1 extends one byte at a time, the hashes of every length at an
//! offset cost one pass over `b` bytes instead of `a + (a+1) + ... + b`.

#![allow(clippy::module_name_repetitions)]

use crate::core::counter::{ConcurrencyMode, TallySnapshot};
use crate::core::range::NgramRange;
use crate::error::{NgramError, Result};
use crate::filters::counting::{CountingBloomFilter, Removal};
use crate::hash::hasher::{Fnv1Hasher, Hash64, NgramHasher};
use crate::ngram::backend::{BackendKind, BackendOptions};
use crate::ngram::window::WindowPlan;
use crate::ngram::{LengthCounts, NgramFilterSet, UpdateSummary};
use crate::stats::{self, DistributionStats, SeriesStats};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::info;

/// One counting Bloom filter per tracked length.
///
/// ```
/// use ngramcraft::core::BloomSizing;
/// use ngramcraft::filters::BloomFilterSet;
/// use ngramcraft::ngram::{BackendOptions, NgramFilterSet};
/// use ngramcraft::NgramRange;
///
/// let options = BackendOptions {
///     sizing: BloomSizing::Explicit { counters: 1 << 12, probes: 4 },
///     ..BackendOptions::default()
/// };
/// let set = BloomFilterSet::new(NgramRange::new(2, 3).unwrap(), &options).unwrap();
/// let summary = set.add_item(b"abcd");
/// assert_eq!(summary.ngrams, 3 + 2);
/// assert!(set.find_ngram(b"bcd").unwrap() >= 1);
/// ```
pub struct BloomFilterSet<H = Fnv1Hasher> {
    range: NgramRange,
    mode: ConcurrencyMode,
    hasher: H,
    filters: Vec<CountingBloomFilter<H>>,
}

impl BloomFilterSet<Fnv1Hasher> {
    /// Allocate an FNV-1 filter per length, sized by `options.sizing`.
    ///
    /// # Errors
    ///
    /// Invalid sizing, or the allocator's error. Filters allocated before a
    /// failure are released.
    pub fn new(range: NgramRange, options: &BackendOptions) -> Result<Self> {
        Self::with_hasher(range, options, Fnv1Hasher::new())
    }
}

impl<H: NgramHasher + Clone> BloomFilterSet<H> {
    /// Allocate a filter per length with a custom hasher.
    ///
    /// # Errors
    ///
    /// Same as [`BloomFilterSet::new`].
    pub fn with_hasher(range: NgramRange, options: &BackendOptions, hasher: H) -> Result<Self> {
        let filters = range
            .iter()
            .map(|n| {
                let params = options.sizing.params(n)?;
                CountingBloomFilter::with_hasher(
                    n,
                    params,
                    Arc::clone(&options.allocator),
                    options.mode,
                    hasher.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            backend = "bloom",
            lengths = %range,
            mode = ?options.mode,
            sizing = ?options.sizing,
            hasher = hasher.name(),
            bytes = filters.iter().map(|f| f.counters().memory_usage()).sum::<usize>(),
            "created n-gram filter set"
        );
        Ok(Self {
            range,
            mode: options.mode,
            hasher,
            filters,
        })
    }
}

impl<H: NgramHasher> BloomFilterSet<H> {
    /// Filter for `ngram`-grams.
    #[must_use]
    pub fn filter(&self, ngram: usize) -> Option<&CountingBloomFilter<H>> {
        self.range.slot(ngram).map(|slot| &self.filters[slot])
    }

    fn tracked(&self, ngram: usize) -> Result<&CountingBloomFilter<H>> {
        self.filter(ngram).ok_or_else(|| {
            NgramError::length_not_tracked(ngram, self.range.min(), self.range.max())
        })
    }

    /// Visit every planned n-gram of `buf` with its filter and hash.
    fn for_each_ngram(
        &self,
        buf: &[u8],
        carried: usize,
        mut visit: impl FnMut(&CountingBloomFilter<H>, Hash64),
    ) {
        let mut hashes = Vec::with_capacity(self.range.len() + 1);
        for span in WindowPlan::new(self.range, buf.len(), carried) {
            self.hasher
                .hash_range_into(&buf[span.offset..], span.min, span.max, &mut hashes);
            for (n, &raw) in (span.min..=span.max).zip(hashes.iter()) {
                if let Some(filter) = self.filter(n) {
                    visit(filter, Hash64::new(raw));
                }
            }
        }
    }

    /// Running counts summed over every length.
    #[must_use]
    pub fn tally(&self) -> TallySnapshot {
        let mut totals = TallySnapshot::default();
        for filter in &self.filters {
            totals += filter.tally();
        }
        totals
    }
}

impl<H: NgramHasher> fmt::Debug for BloomFilterSet<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilterSet")
            .field("range", &self.range)
            .field("mode", &self.mode)
            .field("hasher", &self.hasher.name())
            .field("filters", &self.filters)
            .finish()
    }
}

impl<H: NgramHasher> NgramFilterSet for BloomFilterSet<H> {
    fn kind(&self) -> BackendKind {
        BackendKind::Bloom
    }

    fn lengths(&self) -> NgramRange {
        self.range
    }

    fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    fn add_chunk(&self, chunk: &[u8], carried: usize) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        self.for_each_ngram(chunk, carried, |filter, hash| {
            summary.ngrams += 1;
            summary.overflows += filter.add_hash(hash);
        });
        summary
    }

    fn delete_item(&self, item: &[u8]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        self.for_each_ngram(item, 0, |filter, hash| {
            summary.ngrams += 1;
            match filter.delete_hash(hash) {
                Removal::Removed { underflows } => summary.underflows += underflows,
                Removal::NotFound => summary.not_found += 1,
            }
        });
        summary
    }

    fn find_ngram(&self, window: &[u8]) -> Result<u64> {
        Ok(u64::from(self.tracked(window.len())?.find(window)))
    }

    fn find_item(&self, item: &[u8]) -> u64 {
        let mut total = 0;
        self.for_each_ngram(item, 0, |filter, hash| {
            total += u64::from(filter.find_hash(hash));
        });
        total
    }

    fn find_dist(&self, item: &[u8], ngram: usize) -> Result<SeriesStats> {
        Ok(stats::series_stats(&self.tracked(ngram)?.frequencies(item)))
    }

    fn distribution(&self, ngram: usize) -> Result<DistributionStats> {
        Ok(self.tracked(ngram)?.distribution())
    }

    fn counts(&self, ngram: usize) -> Result<LengthCounts> {
        Ok(self.tracked(ngram)?.counts())
    }

    fn totals(&self) -> TallySnapshot {
        self.tally()
    }

    fn dump(&self, out: &mut dyn io::Write, verbosity: u8) -> io::Result<()> {
        for filter in &self.filters {
            filter.dump(out, verbosity)?;
        }
        out.flush()
    }
}
