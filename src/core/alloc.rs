//! Injected counter storage allocation.
//!
//! Filter sets never allocate counter cells themselves. They describe what they
//! need with an [`AllocationRequest`] and ask a [`CounterAllocator`], which lets
//! a driver redirect storage (for example into a named mapped region it manages)
//! without any change to the backends. The matching `release` is called from
//! [`CounterTable`](crate::core::counter::CounterTable)'s `Drop`, so a set that
//! fails half way through construction still hands back every table it got.
//!
//! Two allocators ship with the crate and coexist in one build:
//!
//! - [`HeapAllocator`]: process heap, failure surfaces as `AllocationFailed`.
//! - [`BoundedAllocator`]: heap with a byte budget and a usage ledger.

#![allow(clippy::module_name_repetitions)]

use crate::core::counter::Counter;
use crate::error::{NgramError, Result};
use crate::ngram::BackendKind;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::AtomicU16;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a filter set needs for one n-gram length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AllocationRequest {
    /// Backend that will own the table.
    pub backend: BackendKind,
    /// N-gram length the table counts.
    pub ngram: usize,
    /// Number of counter cells.
    pub counters: usize,
}

impl AllocationRequest {
    /// Describe a table of `counters` cells for `ngram`-grams.
    #[must_use]
    pub const fn new(backend: BackendKind, ngram: usize, counters: usize) -> Self {
        Self {
            backend,
            ngram,
            counters,
        }
    }

    /// Size of the requested storage in bytes, saturating on overflow.
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.counters.saturating_mul(std::mem::size_of::<Counter>())
    }
}

/// Source of counter storage for filter sets.
///
/// Implementations must return zeroed cells of exactly `request.counters`
/// length, and must accept back through `release` every slice they handed out.
pub trait CounterAllocator: Send + Sync {
    /// Allocate zeroed storage for `request`.
    ///
    /// # Errors
    ///
    /// [`NgramError::AllocationFailed`] or
    /// [`NgramError::AllocationBudgetExceeded`] when the storage cannot be
    /// provided.
    fn allocate(&self, request: &AllocationRequest) -> Result<Box<[AtomicU16]>>;

    /// Return storage previously produced by `allocate` for the same request.
    fn release(&self, request: &AllocationRequest, cells: Box<[AtomicU16]>);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Allocate `request.counters` zeroed cells on the heap.
///
/// Uses `try_reserve_exact` so an impossible size is reported instead of
/// aborting the process.
///
/// # Errors
///
/// [`NgramError::AllocationFailed`] if the reservation fails.
pub fn zeroed_cells(request: &AllocationRequest) -> Result<Box<[AtomicU16]>> {
    let mut cells: Vec<AtomicU16> = Vec::new();
    if cells.try_reserve_exact(request.counters).is_err() {
        warn!(
            ngram = request.ngram,
            counters = request.counters,
            bytes = request.bytes(),
            "counter table allocation failed"
        );
        return Err(NgramError::allocation_failed(
            request.ngram,
            request.counters,
            request.bytes(),
        ));
    }
    cells.resize_with(request.counters, || AtomicU16::new(0));
    Ok(cells.into_boxed_slice())
}

/// Process-heap allocator. The default for every filter set.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl CounterAllocator for HeapAllocator {
    fn allocate(&self, request: &AllocationRequest) -> Result<Box<[AtomicU16]>> {
        zeroed_cells(request)
    }

    fn release(&self, _request: &AllocationRequest, cells: Box<[AtomicU16]>) {
        drop(cells);
    }

    fn name(&self) -> &'static str {
        "heap"
    }
}

/// Usage ledger of a [`BoundedAllocator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AllocatorUsage {
    /// Bytes currently handed out.
    pub in_use: usize,
    /// Highest value `in_use` has reached.
    pub peak: usize,
    /// Tables currently handed out.
    pub live_tables: usize,
    /// Successful allocations so far.
    pub allocations: u64,
    /// Refused allocations so far.
    pub refusals: u64,
}

/// Heap allocator that refuses to hand out more than a fixed number of bytes.
///
/// Stands in for a fixed-size mapped region: a set whose tables do not fit is
/// rejected at construction time rather than when it starts counting.
///
/// # Examples
///
/// ```
/// use ngramcraft::core::alloc::{AllocationRequest, BoundedAllocator, CounterAllocator};
/// use ngramcraft::BackendKind;
///
/// let allocator = BoundedAllocator::new(1024);
/// let request = AllocationRequest::new(BackendKind::Bloom, 3, 256);
/// let cells = allocator.allocate(&request).unwrap();
/// assert_eq!(allocator.usage().in_use, 512);
///
/// assert!(allocator.allocate(&AllocationRequest::new(BackendKind::Bloom, 4, 512)).is_err());
///
/// allocator.release(&request, cells);
/// assert_eq!(allocator.usage().in_use, 0);
/// ```
pub struct BoundedAllocator {
    limit: usize,
    ledger: Mutex<AllocatorUsage>,
}

impl BoundedAllocator {
    /// Create an allocator with a budget of `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ledger: Mutex::new(AllocatorUsage::default()),
        }
    }

    /// The byte budget.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current ledger.
    #[must_use]
    pub fn usage(&self) -> AllocatorUsage {
        *self.ledger.lock()
    }

    /// Bytes still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.ledger.lock().in_use)
    }
}

impl fmt::Debug for BoundedAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedAllocator")
            .field("limit", &self.limit)
            .field("usage", &self.usage())
            .finish()
    }
}

impl CounterAllocator for BoundedAllocator {
    fn allocate(&self, request: &AllocationRequest) -> Result<Box<[AtomicU16]>> {
        let bytes = request.bytes();
        let mut ledger = self.ledger.lock();

        if ledger.in_use.saturating_add(bytes) > self.limit {
            ledger.refusals += 1;
            warn!(
                ngram = request.ngram,
                requested = bytes,
                in_use = ledger.in_use,
                limit = self.limit,
                "counter table exceeds allocator budget"
            );
            return Err(NgramError::budget_exceeded(
                request.ngram,
                bytes,
                ledger.in_use,
                self.limit,
            ));
        }

        // Reserve the budget, then zero without holding the lock.
        ledger.in_use += bytes;
        ledger.peak = ledger.peak.max(ledger.in_use);
        ledger.live_tables += 1;
        ledger.allocations += 1;
        drop(ledger);

        zeroed_cells(request).map_err(|e| {
            let mut ledger = self.ledger.lock();
            ledger.in_use = ledger.in_use.saturating_sub(bytes);
            ledger.live_tables = ledger.live_tables.saturating_sub(1);
            ledger.allocations = ledger.allocations.saturating_sub(1);
            e
        })
    }

    fn release(&self, request: &AllocationRequest, cells: Box<[AtomicU16]>) {
        let bytes = cells.len() * std::mem::size_of::<AtomicU16>();
        debug_assert_eq!(bytes, request.bytes());
        drop(cells);

        let mut ledger = self.ledger.lock();
        ledger.in_use = ledger.in_use.saturating_sub(bytes);
        ledger.live_tables = ledger.live_tables.saturating_sub(1);
    }

    fn name(&self) -> &'static str {
        "bounded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_request_bytes() {
        let request = AllocationRequest::new(BackendKind::Array, 2, 65536);
        assert_eq!(request.bytes(), 131_072);
        let huge = AllocationRequest::new(BackendKind::Array, 8, usize::MAX);
        assert_eq!(huge.bytes(), usize::MAX);
    }

    #[test]
    fn test_heap_allocates_zeroed() {
        let request = AllocationRequest::new(BackendKind::Bloom, 5, 100);
        let cells = HeapAllocator.allocate(&request).unwrap();
        assert_eq!(cells.len(), 100);
        assert!(cells.iter().all(|c| c.load(Ordering::Relaxed) == 0));
        HeapAllocator.release(&request, cells);
    }

    #[test]
    fn test_heap_reports_impossible_size() {
        let request = AllocationRequest::new(BackendKind::Array, 8, usize::MAX / 2);
        let err = HeapAllocator.allocate(&request).unwrap_err();
        assert!(err.is_allocation());
        assert!(matches!(err, NgramError::AllocationFailed { ngram: 8, .. }));
    }

    #[test]
    fn test_bounded_ledger() {
        let allocator = BoundedAllocator::new(1000);
        let small = AllocationRequest::new(BackendKind::Bloom, 1, 100);
        let a = allocator.allocate(&small).unwrap();
        let b = allocator.allocate(&small).unwrap();

        let usage = allocator.usage();
        assert_eq!(usage.in_use, 400);
        assert_eq!(usage.live_tables, 2);
        assert_eq!(usage.allocations, 2);
        assert_eq!(allocator.remaining(), 600);

        allocator.release(&small, a);
        allocator.release(&small, b);

        let usage = allocator.usage();
        assert_eq!(usage.in_use, 0);
        assert_eq!(usage.peak, 400);
        assert_eq!(usage.live_tables, 0);
    }

    #[test]
    fn test_bounded_refuses_over_budget() {
        let allocator = BoundedAllocator::new(100);
        let request = AllocationRequest::new(BackendKind::Bloom, 4, 51);
        let err = allocator.allocate(&request).unwrap_err();
        assert_eq!(err, NgramError::budget_exceeded(4, 102, 0, 100));
        assert_eq!(allocator.usage().refusals, 1);
        assert_eq!(allocator.usage().in_use, 0);
    }

    #[test]
    fn test_bounded_rolls_back_failed_zeroing() {
        let allocator = BoundedAllocator::new(usize::MAX);
        let impossible = AllocationRequest::new(BackendKind::Array, 8, usize::MAX / 2);
        let err = allocator.allocate(&impossible).unwrap_err();
        assert!(matches!(err, NgramError::AllocationFailed { ngram: 8, .. }));

        let usage = allocator.usage();
        assert_eq!(usage.in_use, 0);
        assert_eq!(usage.live_tables, 0);
        assert_eq!(usage.allocations, 0);
        assert_eq!(usage.refusals, 0);

        let small = AllocationRequest::new(BackendKind::Bloom, 1, 8);
        let cells = allocator.allocate(&small).unwrap();
        assert_eq!(allocator.usage().in_use, 16);
        allocator.release(&small, cells);
    }

    #[test]
    fn test_bounded_exact_fit() {
        let allocator = BoundedAllocator::new(100);
        let request = AllocationRequest::new(BackendKind::Bloom, 4, 50);
        let cells = allocator.allocate(&request).unwrap();
        assert_eq!(allocator.remaining(), 0);
        allocator.release(&request, cells);
    }
}
