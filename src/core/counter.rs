//! Saturating 16-bit counter tables and event tallies.
//!
//! Both backends store their frequencies in a [`CounterTable`]: a boxed slice of
//! `AtomicU16` cells obtained from an injected
//! [`CounterAllocator`](crate::core::alloc::CounterAllocator) and handed back to
//! it when the table is dropped.
//!
//! # Saturation
//!
//! Counters stop at [`COUNTER_MAX`] (`0xFFF0`), below the type's true maximum.
//! Once a cell reaches the ceiling its real count is unknown, so:
//!
//! | Operation | Cell value | Result |
//! |-----------|------------|--------|
//! | increment | `0` | becomes `1`, [`Increment::Fresh`] |
//! | increment | `1..MAX` | `+1`, [`Increment::Counted`] |
//! | increment | `MAX` | unchanged, [`Increment::Saturated`] (overflow) |
//! | decrement | `0` | unchanged, [`Decrement::Absent`] |
//! | decrement | `1` | becomes `0`, [`Decrement::Emptied`] |
//! | decrement | `2..MAX` | `-1`, [`Decrement::Counted`] |
//! | decrement | `MAX` | unchanged, [`Decrement::Saturated`] (underflow) |
//!
//! # Concurrency Modes
//!
//! One code path serves both modes. In [`ConcurrencyMode::Exclusive`] cells are
//! updated with relaxed load/store pairs, which is only correct with a single
//! writer. In [`ConcurrencyMode::Shared`] every update is a relaxed
//! compare-and-swap loop, so concurrent writers never lose an update and never
//! push a cell past the ceiling or below zero. "Was this cell zero before my
//! increment" is advisory under `Shared`: two racing writers may both observe
//! the cell as non-zero, or the zero state may be observed by only one of them.

#![allow(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use crate::core::alloc::{AllocationRequest, CounterAllocator};
use crate::error::Result;
use std::fmt;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width of a single counter cell.
pub type Counter = u16;

/// Saturation ceiling for every counter cell.
pub const COUNTER_MAX: Counter = 0xFFF0;

/// How counter cells and tallies are updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConcurrencyMode {
    /// Single writer; plain relaxed load/store updates.
    #[default]
    Exclusive,
    /// Any number of writers; relaxed compare-and-swap updates.
    Shared,
}

impl ConcurrencyMode {
    /// True when updates must be atomic read-modify-write operations.
    #[must_use]
    #[inline]
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::Shared)
    }
}

/// Outcome of incrementing one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// The cell was zero and is now one.
    Fresh,
    /// The cell was non-zero and below the ceiling.
    Counted,
    /// The cell was at [`COUNTER_MAX`] and was left there.
    Saturated,
}

/// Outcome of decrementing one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The cell went from one to zero.
    Emptied,
    /// The cell was decremented and is still non-zero.
    Counted,
    /// The cell was at [`COUNTER_MAX`]; its true value is unknown so it was left alone.
    Saturated,
    /// The cell was already zero.
    Absent,
}

/// A fixed-size table of saturating counters.
///
/// The cells are owned by the table and returned to the allocator that
/// produced them on drop.
pub struct CounterTable {
    cells: Box<[AtomicU16]>,
    mode: ConcurrencyMode,
    request: AllocationRequest,
    allocator: Arc<dyn CounterAllocator>,
}

impl CounterTable {
    /// Allocate a zeroed table through `allocator`.
    ///
    /// # Errors
    ///
    /// Whatever the allocator reports, typically
    /// [`NgramError::AllocationFailed`](crate::NgramError::AllocationFailed).
    pub fn allocate(
        allocator: Arc<dyn CounterAllocator>,
        request: AllocationRequest,
        mode: ConcurrencyMode,
    ) -> Result<Self> {
        let cells = allocator.allocate(&request)?;
        debug!(
            backend = %request.backend,
            ngram = request.ngram,
            counters = request.counters,
            bytes = request.bytes(),
            allocator = allocator.name(),
            "allocated counter table"
        );
        Ok(Self {
            cells,
            mode,
            request,
            allocator,
        })
    }

    /// Number of cells.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the table has no cells.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Storage size in bytes.
    #[must_use]
    #[inline]
    pub fn memory_usage(&self) -> usize {
        self.cells.len() * std::mem::size_of::<AtomicU16>()
    }

    /// Update mode chosen at allocation time.
    #[must_use]
    #[inline]
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// The request this table was allocated for.
    #[must_use]
    pub fn request(&self) -> &AllocationRequest {
        &self.request
    }

    /// Current value of cell `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Counter {
        self.cells[index].load(Ordering::Relaxed)
    }

    /// Increment cell `index`, saturating at [`COUNTER_MAX`].
    #[inline]
    pub fn increment(&self, index: usize) -> Increment {
        let cell = &self.cells[index];
        let mut current = cell.load(Ordering::Relaxed);

        loop {
            if current >= COUNTER_MAX {
                return Increment::Saturated;
            }
            let outcome = if current == 0 {
                Increment::Fresh
            } else {
                Increment::Counted
            };

            match self.mode {
                ConcurrencyMode::Exclusive => {
                    cell.store(current + 1, Ordering::Relaxed);
                    return outcome;
                }
                ConcurrencyMode::Shared => match cell.compare_exchange_weak(
                    current,
                    current + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return outcome,
                    Err(actual) => current = actual,
                },
            }
        }
    }

    /// Decrement cell `index` unless it is zero or saturated.
    #[inline]
    pub fn decrement(&self, index: usize) -> Decrement {
        let cell = &self.cells[index];
        let mut current = cell.load(Ordering::Relaxed);

        loop {
            if current >= COUNTER_MAX {
                return Decrement::Saturated;
            }
            if current == 0 {
                return Decrement::Absent;
            }
            let outcome = if current == 1 {
                Decrement::Emptied
            } else {
                Decrement::Counted
            };

            match self.mode {
                ConcurrencyMode::Exclusive => {
                    cell.store(current - 1, Ordering::Relaxed);
                    return outcome;
                }
                ConcurrencyMode::Shared => match cell.compare_exchange_weak(
                    current,
                    current - 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return outcome,
                    Err(actual) => current = actual,
                },
            }
        }
    }

    /// Iterate over every cell value in index order.
    pub fn values(&self) -> impl Iterator<Item = Counter> + '_ {
        self.cells.iter().map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Iterate over `(index, value)` for non-zero cells.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, Counter)> + '_ {
        self.values()
            .enumerate()
            .filter(|&(_, value)| value != 0)
    }

    /// Number of non-zero cells.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.values().filter(|&value| value != 0).count()
    }

    /// Number of cells stuck at [`COUNTER_MAX`].
    #[must_use]
    pub fn saturated_count(&self) -> usize {
        self.values().filter(|&value| value >= COUNTER_MAX).count()
    }

    /// Raw cells, for the statistics adapter.
    #[must_use]
    pub fn cells(&self) -> &[AtomicU16] {
        &self.cells
    }

    /// Reset every cell to zero.
    pub fn clear(&self) {
        for cell in self.cells.iter() {
            cell.store(0, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for CounterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterTable")
            .field("len", &self.cells.len())
            .field("mode", &self.mode)
            .field("request", &self.request)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

impl Drop for CounterTable {
    fn drop(&mut self) {
        let cells = std::mem::take(&mut self.cells);
        debug!(
            backend = %self.request.backend,
            ngram = self.request.ngram,
            bytes = self.request.bytes(),
            allocator = self.allocator.name(),
            "released counter table"
        );
        self.allocator.release(&self.request, cells);
    }
}

/// Running per-filter statistics.
///
/// `total` counts n-grams added (the Bloom filter's `n`), `distinct` counts
/// zero-to-nonzero transitions (`d`), and the three event counters record
/// refused updates. All fields are relaxed atomics so a shared filter can be
/// updated through `&self`.
#[derive(Debug, Default)]
pub struct Tally {
    total: AtomicU64,
    distinct: AtomicU64,
    overflows: AtomicU64,
    underflows: AtomicU64,
    not_found: AtomicU64,
}

/// A point-in-time copy of a [`Tally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TallySnapshot {
    /// Items added minus items removed.
    pub total: u64,
    /// Approximate number of distinct items present.
    pub distinct: u64,
    /// Increments refused at the ceiling.
    pub overflows: u64,
    /// Decrements refused on saturated cells.
    pub underflows: u64,
    /// Removals of items that were not present.
    pub not_found: u64,
}

impl Tally {
    /// Create a zeroed tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn add(field: &AtomicU64, amount: u64, mode: ConcurrencyMode) {
        if amount == 0 {
            return;
        }
        match mode {
            ConcurrencyMode::Exclusive => {
                let current = field.load(Ordering::Relaxed);
                field.store(current.saturating_add(amount), Ordering::Relaxed);
            }
            ConcurrencyMode::Shared => {
                field.fetch_add(amount, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    fn sub(field: &AtomicU64, amount: u64, mode: ConcurrencyMode) {
        if amount == 0 {
            return;
        }
        match mode {
            ConcurrencyMode::Exclusive => {
                let current = field.load(Ordering::Relaxed);
                field.store(current.saturating_sub(amount), Ordering::Relaxed);
            }
            ConcurrencyMode::Shared => {
                let _ = field.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(amount))
                });
            }
        }
    }

    /// Record `count` added items.
    #[inline]
    pub fn record_added(&self, count: u64, mode: ConcurrencyMode) {
        Self::add(&self.total, count, mode);
    }

    /// Record `count` removed items, saturating at zero.
    #[inline]
    pub fn record_removed(&self, count: u64, mode: ConcurrencyMode) {
        Self::sub(&self.total, count, mode);
    }

    /// Record `count` newly distinct items.
    #[inline]
    pub fn record_distinct(&self, count: u64, mode: ConcurrencyMode) {
        Self::add(&self.distinct, count, mode);
    }

    /// Record `count` items that are no longer present, saturating at zero.
    #[inline]
    pub fn record_vanished(&self, count: u64, mode: ConcurrencyMode) {
        Self::sub(&self.distinct, count, mode);
    }

    /// Record refused increments.
    #[inline]
    pub fn record_overflows(&self, count: u64, mode: ConcurrencyMode) {
        Self::add(&self.overflows, count, mode);
    }

    /// Record refused decrements.
    #[inline]
    pub fn record_underflows(&self, count: u64, mode: ConcurrencyMode) {
        Self::add(&self.underflows, count, mode);
    }

    /// Record removals of absent items.
    #[inline]
    pub fn record_not_found(&self, count: u64, mode: ConcurrencyMode) {
        Self::add(&self.not_found, count, mode);
    }

    /// Items added minus items removed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Approximate distinct items present.
    #[must_use]
    pub fn distinct(&self) -> u64 {
        self.distinct.load(Ordering::Relaxed)
    }

    /// Refused increments.
    #[must_use]
    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Refused decrements.
    #[must_use]
    pub fn underflows(&self) -> u64 {
        self.underflows.load(Ordering::Relaxed)
    }

    /// Removals of absent items.
    #[must_use]
    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    /// Copy every field.
    #[must_use]
    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            total: self.total(),
            distinct: self.distinct(),
            overflows: self.overflows(),
            underflows: self.underflows(),
            not_found: self.not_found(),
        }
    }

    /// Reset every field to zero.
    pub fn reset(&self) {
        for field in [
            &self.total,
            &self.distinct,
            &self.overflows,
            &self.underflows,
            &self.not_found,
        ] {
            field.store(0, Ordering::Relaxed);
        }
    }
}

impl std::ops::AddAssign for TallySnapshot {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.distinct += rhs.distinct;
        self.overflows += rhs.overflows;
        self.underflows += rhs.underflows;
        self.not_found += rhs.not_found;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alloc::HeapAllocator;
    use crate::ngram::BackendKind;

    fn table(counters: usize, mode: ConcurrencyMode) -> CounterTable {
        CounterTable::allocate(
            Arc::new(HeapAllocator),
            AllocationRequest::new(BackendKind::Bloom, 3, counters),
            mode,
        )
        .unwrap()
    }

    #[test]
    fn test_allocate_zeroed() {
        let t = table(64, ConcurrencyMode::Exclusive);
        assert_eq!(t.len(), 64);
        assert_eq!(t.memory_usage(), 128);
        assert!(t.values().all(|v| v == 0));
        assert_eq!(t.count_nonzero(), 0);
    }

    #[test]
    fn test_increment_outcomes() {
        for mode in [ConcurrencyMode::Exclusive, ConcurrencyMode::Shared] {
            let t = table(4, mode);
            assert_eq!(t.increment(1), Increment::Fresh);
            assert_eq!(t.increment(1), Increment::Counted);
            assert_eq!(t.get(1), 2);
            assert_eq!(t.get(0), 0);
        }
    }

    #[test]
    fn test_increment_saturates() {
        for mode in [ConcurrencyMode::Exclusive, ConcurrencyMode::Shared] {
            let t = table(1, mode);
            let mut saturated = 0;
            for _ in 0..=u32::from(COUNTER_MAX) {
                if t.increment(0) == Increment::Saturated {
                    saturated += 1;
                }
            }
            assert_eq!(t.get(0), COUNTER_MAX);
            assert_eq!(saturated, 1);
            assert_eq!(t.saturated_count(), 1);
        }
    }

    #[test]
    fn test_decrement_outcomes() {
        for mode in [ConcurrencyMode::Exclusive, ConcurrencyMode::Shared] {
            let t = table(2, mode);
            assert_eq!(t.decrement(0), Decrement::Absent);
            t.increment(0);
            t.increment(0);
            assert_eq!(t.decrement(0), Decrement::Counted);
            assert_eq!(t.decrement(0), Decrement::Emptied);
            assert_eq!(t.decrement(0), Decrement::Absent);
            assert_eq!(t.get(0), 0);
        }
    }

    #[test]
    fn test_decrement_refused_when_saturated() {
        let t = table(1, ConcurrencyMode::Exclusive);
        for _ in 0..COUNTER_MAX {
            t.increment(0);
        }
        assert_eq!(t.decrement(0), Decrement::Saturated);
        assert_eq!(t.get(0), COUNTER_MAX);
    }

    #[test]
    fn test_occupied_and_clear() {
        let t = table(8, ConcurrencyMode::Exclusive);
        t.increment(2);
        t.increment(5);
        t.increment(5);
        assert_eq!(t.occupied().collect::<Vec<_>>(), vec![(2, 1), (5, 2)]);
        t.clear();
        assert_eq!(t.count_nonzero(), 0);
    }

    #[test]
    fn test_shared_increments_not_lost() {
        let t = table(1, ConcurrencyMode::Shared);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        t.increment(0);
                    }
                });
            }
        });
        assert_eq!(t.get(0), 4000);
    }

    #[test]
    fn test_tally_updates() {
        let tally = Tally::new();
        tally.record_added(3, ConcurrencyMode::Exclusive);
        tally.record_distinct(2, ConcurrencyMode::Exclusive);
        tally.record_removed(5, ConcurrencyMode::Exclusive);
        tally.record_vanished(1, ConcurrencyMode::Shared);
        tally.record_overflows(1, ConcurrencyMode::Shared);
        tally.record_underflows(2, ConcurrencyMode::Shared);
        tally.record_not_found(4, ConcurrencyMode::Exclusive);

        assert_eq!(
            tally.snapshot(),
            TallySnapshot {
                total: 0,
                distinct: 1,
                overflows: 1,
                underflows: 2,
                not_found: 4,
            }
        );

        tally.reset();
        assert_eq!(tally.snapshot(), TallySnapshot::default());
    }

    #[test]
    fn test_tally_shared_saturating_sub() {
        let tally = Tally::new();
        tally.record_removed(1, ConcurrencyMode::Shared);
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn test_snapshot_add_assign() {
        let mut a = TallySnapshot {
            total: 1,
            distinct: 1,
            ..Default::default()
        };
        a += TallySnapshot {
            total: 2,
            overflows: 3,
            ..Default::default()
        };
        assert_eq!(a.total, 3);
        assert_eq!(a.distinct, 1);
        assert_eq!(a.overflows, 3);
    }
}
