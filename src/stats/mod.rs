//! Distribution statistics over counter tables and probe series.
//!
//! # Counter tables
//!
//! [`distribution_stats`] summarizes a raw table of any unsigned width
//! (`u8`..`u64` or their atomic forms) as
//!
//! | Statistic | Formula |
//! |-----------|---------|
//! | mean | `μ = Σx / n` |
//! | standard deviation | `sqrt((Σx² − nμ²) / (n − 1))` |
//! | max, min | extreme cell values |
//! | chi-square | `Σ(x − μ)² / μ`, only when `μ > 0` |
//!
//! `Σx` and `Σx²` are accumulated exactly in `u128`, so even a `2^32` cell
//! table of saturated 16-bit counters loses nothing before the final division.
//! With the `rayon` feature, [`distribution_stats_parallel`] splits the two
//! passes across threads and returns the same numbers.
//!
//! # Probe series
//!
//! [`series_stats`] summarizes the frequencies seen along one payload: mean,
//! standard deviation and lag-1 autocorrelation
//! `ρ = Σ(xᵢ − μ)(xᵢ₋₁ − μ) / Σ(xᵢ₋₁ − μ)²`.
//!
//! # Example
//!
//! ```
//! use ngramcraft::stats::distribution_stats;
//!
//! let stats = distribution_stats(&[0u16, 0, 5, 5, 5, 5, 0, 0]);
//! assert_eq!(stats.mean, 2.5);
//! assert_eq!(stats.max, 5);
//! assert_eq!(stats.min, 0);
//! assert_eq!(stats.chi_square, Some(20.0));
//! ```

#![allow(clippy::cast_precision_loss)]

use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cell of an unsigned counter table.
pub trait CounterValue: Sync {
    /// The cell's current value widened to `u64`.
    fn value(&self) -> u64;
}

macro_rules! plain_counter_value {
    ($($ty:ty),*) => {
        $(impl CounterValue for $ty {
            #[inline]
            fn value(&self) -> u64 {
                u64::from(*self)
            }
        })*
    };
}

macro_rules! atomic_counter_value {
    ($($ty:ty),*) => {
        $(impl CounterValue for $ty {
            #[inline]
            fn value(&self) -> u64 {
                u64::from(self.load(Ordering::Relaxed))
            }
        })*
    };
}

plain_counter_value!(u8, u16, u32, u64);
atomic_counter_value!(AtomicU8, AtomicU16, AtomicU32, AtomicU64);

/// Summary of a counter table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistributionStats {
    /// Number of cells.
    pub cells: usize,
    /// Sum of every cell.
    pub total: u128,
    /// Mean cell value.
    pub mean: f64,
    /// Sample standard deviation; `0` for fewer than two cells.
    pub std_dev: f64,
    /// Largest cell value.
    pub max: u64,
    /// Smallest cell value.
    pub min: u64,
    /// `Σ(x − μ)² / μ`, absent when the table is all zeros.
    pub chi_square: Option<f64>,
}

impl DistributionStats {
    /// Index of dispersion `σ² / μ`, absent when `μ = 0`.
    #[must_use]
    pub fn dispersion(&self) -> Option<f64> {
        (self.mean > 0.0).then(|| self.std_dev * self.std_dev / self.mean)
    }
}

#[derive(Debug, Clone, Copy)]
struct Moments {
    cells: usize,
    sum: u128,
    sum_squares: u128,
    max: u64,
    min: u64,
}

impl Moments {
    const EMPTY: Self = Self {
        cells: 0,
        sum: 0,
        sum_squares: 0,
        max: 0,
        min: u64::MAX,
    };

    #[inline]
    fn push(mut self, value: u64) -> Self {
        let wide = u128::from(value);
        self.cells += 1;
        self.sum += wide;
        self.sum_squares += wide * wide;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
        self
    }

    #[cfg(feature = "rayon")]
    fn merge(self, other: Self) -> Self {
        Self {
            cells: self.cells + other.cells,
            sum: self.sum + other.sum,
            sum_squares: self.sum_squares + other.sum_squares,
            max: self.max.max(other.max),
            min: self.min.min(other.min),
        }
    }

    fn finish(self, squared_deviation: impl FnOnce(f64) -> f64) -> DistributionStats {
        if self.cells == 0 {
            return DistributionStats::default();
        }
        let n = self.cells as f64;
        let mean = self.sum as f64 / n;
        let std_dev = if self.cells < 2 {
            0.0
        } else {
            ((self.sum_squares as f64 - n * mean * mean) / (n - 1.0))
                .max(0.0)
                .sqrt()
        };
        let chi_square = (mean > 0.0).then(|| squared_deviation(mean) / mean);
        DistributionStats {
            cells: self.cells,
            total: self.sum,
            mean,
            std_dev,
            max: self.max,
            min: self.min,
            chi_square,
        }
    }
}

#[inline]
fn squared_deviation(value: u64, mean: f64) -> f64 {
    let delta = value as f64 - mean;
    delta * delta
}

/// Summarize a counter table. An empty table yields all zeros.
#[must_use]
pub fn distribution_stats<T: CounterValue>(values: &[T]) -> DistributionStats {
    let moments = values
        .iter()
        .fold(Moments::EMPTY, |acc, cell| acc.push(cell.value()));
    moments.finish(|mean| {
        values
            .iter()
            .map(|cell| squared_deviation(cell.value(), mean))
            .sum()
    })
}

/// [`distribution_stats`] with both passes spread over the rayon pool.
#[cfg(feature = "rayon")]
#[must_use]
pub fn distribution_stats_parallel<T: CounterValue>(values: &[T]) -> DistributionStats {
    let moments = values
        .par_iter()
        .fold(|| Moments::EMPTY, |acc, cell| acc.push(cell.value()))
        .reduce(|| Moments::EMPTY, Moments::merge);
    moments.finish(|mean| {
        values
            .par_iter()
            .map(|cell| squared_deviation(cell.value(), mean))
            .sum()
    })
}

/// Tables at least this large are summarized on the rayon pool by [`summarize`].
pub const PARALLEL_THRESHOLD: usize = 1 << 20;

/// Summarize a counter table, in parallel when the `rayon` feature is on and
/// the table has at least [`PARALLEL_THRESHOLD`] cells.
#[must_use]
pub fn summarize<T: CounterValue>(values: &[T]) -> DistributionStats {
    #[cfg(feature = "rayon")]
    {
        if values.len() >= PARALLEL_THRESHOLD {
            return distribution_stats_parallel(values);
        }
    }
    distribution_stats(values)
}

/// Summary of the frequencies observed along one payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeriesStats {
    /// Number of samples.
    pub samples: usize,
    /// Sum of the samples.
    pub total: u64,
    /// Mean sample.
    pub mean: f64,
    /// Sample standard deviation; `0` for fewer than two samples.
    pub std_dev: f64,
    /// Lag-1 autocorrelation; absent for constant or single-sample series.
    pub autocorrelation: Option<f64>,
}

/// Summarize a series of frequencies.
#[must_use]
pub fn series_stats(series: &[u64]) -> SeriesStats {
    if series.is_empty() {
        return SeriesStats::default();
    }
    let summary = distribution_stats(series);
    let mean = summary.mean;

    let mut cross = 0.0;
    let mut lagged = 0.0;
    for pair in series.windows(2) {
        let previous = pair[0] as f64 - mean;
        cross += (pair[1] as f64 - mean) * previous;
        lagged += previous * previous;
    }

    SeriesStats {
        samples: series.len(),
        total: series.iter().sum(),
        mean,
        std_dev: summary.std_dev,
        autocorrelation: (lagged > 0.0).then(|| cross / lagged),
    }
}

/// Shannon entropy of a payload's byte distribution, in bits (0 to 8).
///
/// ```
/// use ngramcraft::stats::byte_entropy;
///
/// assert_eq!(byte_entropy(b"aaaa"), 0.0);
/// assert!((byte_entropy(b"abcd") - 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn byte_entropy(payload: &[u8]) -> f64 {
    if payload.is_empty() {
        return 0.0;
    }
    let mut histogram = [0usize; 256];
    for &byte in payload {
        histogram[usize::from(byte)] += 1;
    }
    let len = payload.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}
