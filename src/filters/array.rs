//! Direct-indexed counter arrays for short n-grams.
//!
//! For `n <= 4` every possible n-gram fits in a table of `2^(8n)` counters, so
//! the packed n-gram itself is the index and counts are exact (up to
//! saturation). The packing is big-endian: see [`crate::util::bitops`].
//!
//! # Memory
//!
//! | n | cells | bytes |
//! |---|-------|-------|
//! | 1 | 256 | 512 B |
//! | 2 | 65 536 | 128 KiB |
//! | 3 | 16 777 216 | 32 MiB |
//! | 4 | 4 294 967 296 | 8 GiB |
//!
//! # Counting
//!
//! Each length's table keeps its own [`Tally`]: `total` is windows added minus
//! windows removed, `distinct` counts cells that went from zero to non-zero
//! minus cells that went back to zero. A delete of a window whose cell is zero
//! is refused and counted as `not_found`; a delete on a saturated cell is
//! refused and counted as an underflow.
//!
//! The tables are only safe for concurrent writers when built with
//! [`ConcurrencyMode::Shared`].

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

use crate::core::alloc::{AllocationRequest, CounterAllocator};
use crate::core::counter::{
    ConcurrencyMode, Counter, CounterTable, Decrement, Increment, Tally, TallySnapshot,
};
use crate::core::params::array_counters;
use crate::core::range::NgramRange;
use crate::error::{NgramError, Result};
use crate::ngram::backend::{BackendKind, BackendOptions};
use crate::ngram::window::first_counted_offset;
use crate::ngram::{LengthCounts, NgramFilterSet, UpdateSummary, NGRAM_MAX};
use crate::stats::{self, DistributionStats, SeriesStats};
use crate::util::bitops::{ngram_mask, pack_ngram, render_bytes, unpack_ngram, WindowPacker};
use std::io;
use std::sync::Arc;
use tracing::info;

/// Counter table for one n-gram length, indexed by the packed n-gram.
#[derive(Debug)]
pub struct ArrayNgramTable {
    ngram: usize,
    counters: CounterTable,
    tally: Tally,
}

impl ArrayNgramTable {
    /// Allocate a zeroed table for `ngram`-grams.
    ///
    /// # Errors
    ///
    /// [`NgramError::UnsupportedLength`] for lengths outside `1..=4`, or the
    /// allocator's error.
    pub fn new(
        ngram: usize,
        allocator: Arc<dyn CounterAllocator>,
        mode: ConcurrencyMode,
    ) -> Result<Self> {
        let cells = array_counters(ngram)?;
        let request = AllocationRequest::new(BackendKind::Array, ngram, cells);
        Ok(Self {
            ngram,
            counters: CounterTable::allocate(allocator, request, mode)?,
            tally: Tally::new(),
        })
    }

    /// N-gram length.
    #[must_use]
    #[inline]
    pub fn ngram(&self) -> usize {
        self.ngram
    }

    /// The underlying counters.
    #[must_use]
    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    /// Running counts.
    #[must_use]
    pub fn tally(&self) -> TallySnapshot {
        self.tally.snapshot()
    }

    #[inline]
    fn mode(&self) -> ConcurrencyMode {
        self.counters.mode()
    }

    /// Table index of the first `n` bytes of `window`.
    #[must_use]
    #[inline]
    pub fn index_of(&self, window: &[u8]) -> usize {
        (pack_ngram(&window[..self.ngram.min(window.len())]) & ngram_mask(self.ngram)) as usize
    }

    /// Count every window of `item` that reaches past its first `carried` bytes.
    pub fn add(&self, item: &[u8], carried: usize) -> UpdateSummary {
        let start = first_counted_offset(self.ngram, carried).min(item.len());
        let mut summary = UpdateSummary::default();
        let mut distinct = 0;

        for index in WindowPacker::new(&item[start..], self.ngram) {
            summary.ngrams += 1;
            match self.counters.increment(index as usize) {
                Increment::Fresh => distinct += 1,
                Increment::Counted => {}
                Increment::Saturated => summary.overflows += 1,
            }
        }

        let mode = self.mode();
        self.tally.record_added(summary.ngrams, mode);
        self.tally.record_distinct(distinct, mode);
        self.tally.record_overflows(summary.overflows, mode);
        summary
    }

    /// Remove every window of `item`.
    pub fn delete(&self, item: &[u8]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut removed = 0;
        let mut vanished = 0;

        for index in WindowPacker::new(item, self.ngram) {
            summary.ngrams += 1;
            match self.counters.decrement(index as usize) {
                Decrement::Emptied => {
                    removed += 1;
                    vanished += 1;
                }
                Decrement::Counted => removed += 1,
                Decrement::Saturated => {
                    removed += 1;
                    summary.underflows += 1;
                }
                Decrement::Absent => summary.not_found += 1,
            }
        }

        let mode = self.mode();
        self.tally.record_removed(removed, mode);
        self.tally.record_vanished(vanished, mode);
        self.tally.record_underflows(summary.underflows, mode);
        self.tally.record_not_found(summary.not_found, mode);
        summary
    }

    /// Count of the n-gram formed by the first `n` bytes of `window`; `0` if
    /// `window` is shorter than `n`.
    #[must_use]
    #[inline]
    pub fn find(&self, window: &[u8]) -> Counter {
        if window.len() < self.ngram {
            return 0;
        }
        self.counters.get(self.index_of(window))
    }

    /// Summed count of every window of `item`.
    #[must_use]
    pub fn find_over_range(&self, item: &[u8]) -> u64 {
        if item.len() == self.ngram {
            return u64::from(self.find(item));
        }
        WindowPacker::new(item, self.ngram)
            .map(|index| u64::from(self.counters.get(index as usize)))
            .sum()
    }

    /// Counts of `item`'s first [`NGRAM_MAX`] windows, in order.
    #[must_use]
    pub fn frequencies(&self, item: &[u8]) -> Vec<u64> {
        WindowPacker::new(item, self.ngram)
            .take(NGRAM_MAX)
            .map(|index| u64::from(self.counters.get(index as usize)))
            .collect()
    }

    /// Statistics of the whole table.
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

    /// Write the occupied cells and a summary line.
    ///
    /// Verbosity 0 writes only the summary, 1 adds cells counted at least 100
    /// times, 2 and up add every occupied cell.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn dump(&self, out: &mut dyn io::Write, verbosity: u8) -> io::Result<()> {
        let mut total = 0u64;
        let mut distinct = 0u64;
        let mut over = [0u64; 3];

        for (index, count) in self.counters.occupied() {
            distinct += 1;
            total += u64::from(count);
            for (slot, threshold) in [10_000, 1_000, 100].into_iter().enumerate() {
                if count >= threshold {
                    over[slot] += 1;
                }
            }
            if verbosity >= 2 || (verbosity == 1 && count >= 100) {
                let bytes = unpack_ngram(index as u64, self.ngram);
                writeln!(out, "{count}:{}", render_bytes(&bytes))?;
            }
        }

        writeln!(
            out,
            "ngram {}: {} total {} distinct {} {} {}",
            self.ngram, total, distinct, over[0], over[1], over[2]
        )
    }
}

/// Array tables for every length in a range.
///
/// ```
/// use ngramcraft::filters::ArrayFilterSet;
/// use ngramcraft::ngram::{BackendOptions, NgramFilterSet};
/// use ngramcraft::NgramRange;
///
/// let set = ArrayFilterSet::new(NgramRange::new(1, 2).unwrap(), &BackendOptions::default()).unwrap();
/// set.add_item(b"hello");
/// assert_eq!(set.find_ngram(b"l").unwrap(), 2);
/// assert_eq!(set.find_ngram(b"ll").unwrap(), 1);
/// assert_eq!(set.find_ngram(b"lo").unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct ArrayFilterSet {
    range: NgramRange,
    mode: ConcurrencyMode,
    tables: Vec<ArrayNgramTable>,
}

impl ArrayFilterSet {
    /// Allocate one table per length.
    ///
    /// # Errors
    ///
    /// [`NgramError::UnsupportedLength`] if the range reaches past 4, or the
    /// allocator's error. Tables allocated before a failure are released.
    pub fn new(range: NgramRange, options: &BackendOptions) -> Result<Self> {
        let tables = range
            .iter()
            .map(|n| ArrayNgramTable::new(n, Arc::clone(&options.allocator), options.mode))
            .collect::<Result<Vec<_>>>()?;

        info!(
            backend = "array",
            lengths = %range,
            mode = ?options.mode,
            bytes = tables.iter().map(|t| t.counters.memory_usage()).sum::<usize>(),
            "created n-gram filter set"
        );
        Ok(Self {
            range,
            mode: options.mode,
            tables,
        })
    }

    /// Table for `ngram`-grams.
    #[must_use]
    pub fn table(&self, ngram: usize) -> Option<&ArrayNgramTable> {
        self.range.slot(ngram).map(|slot| &self.tables[slot])
    }

    fn tracked(&self, ngram: usize) -> Result<&ArrayNgramTable> {
        self.table(ngram).ok_or_else(|| {
            NgramError::length_not_tracked(ngram, self.range.min(), self.range.max())
        })
    }
}

impl NgramFilterSet for ArrayFilterSet {
    fn kind(&self) -> BackendKind {
        BackendKind::Array
    }

    fn lengths(&self) -> NgramRange {
        self.range
    }

    fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    fn add_chunk(&self, chunk: &[u8], carried: usize) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        for table in &self.tables {
            summary += table.add(chunk, carried);
        }
        summary
    }

    fn delete_item(&self, item: &[u8]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        for table in &self.tables {
            summary += table.delete(item);
        }
        summary
    }

    fn find_ngram(&self, window: &[u8]) -> Result<u64> {
        Ok(u64::from(self.tracked(window.len())?.find(window)))
    }

    fn find_item(&self, item: &[u8]) -> u64 {
        self.tables.iter().map(|table| table.find_over_range(item)).sum()
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

    fn dump(&self, out: &mut dyn io::Write, verbosity: u8) -> io::Result<()> {
        for table in &self.tables {
            table.dump(out, verbosity)?;
        }
        out.flush()
    }
}
