//! Table sizing for both backends.
//!
//! # Counting Bloom filters
//!
//! Instead of solving `m = -n ln(ε) / (ln 2)²` for an arbitrary error rate,
//! the table size is a fixed multiple of a projected number of distinct
//! n-grams, and `k` follows from that fixed ratio:
//!
//! ```text
//! m = entries(n) × ratio          ratio = 32 (Standard) or 20 (Small)
//! k = ⌈ln 2 × ratio⌉              k     = 23            or 14
//! ```
//!
//! A ratio of 32 corresponds to roughly 0.1 false positives per million
//! lookups at the projected load. The projected entries come from
//! [`PROJECTED_ENTRIES`]: lengths 1 to 3 are sized to avoid collisions
//! entirely, lengths 4 and up follow `2^(n/4 + 23)`, and anything longer than
//! [`MAX_PROJECTED_NGRAM`] uses the last row.
//!
//! # Counter arrays
//!
//! The array backend indexes directly by the packed n-gram, so a length `n`
//! table has `2^(8n)` cells. Lengths above [`ARRAY_MAX_NGRAM`] are refused.

#![allow(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{NgramError, Result};
use std::f64::consts::LN_2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Last row of [`PROJECTED_ENTRIES`].
pub const MAX_PROJECTED_NGRAM: usize = 25;

/// Projected distinct n-grams per length, indexed by length.
pub const PROJECTED_ENTRIES: [usize; MAX_PROJECTED_NGRAM + 1] = [
    0,
    600,
    100_000,
    20_000_000,
    16_777_216,
    19_951_585,
    23_726_566,
    28_215_802,
    33_554_432,
    39_903_169,
    47_453_133,
    56_431_603,
    67_108_864,
    79_806_339,
    94_906_266,
    112_863_206,
    134_217_728,
    159_612_677,
    189_812_531,
    225_726_413,
    268_435_456,
    319_225_354,
    379_625_063,
    451_452_825,
    536_870_912,
    638_450_708,
];

/// Counters per projected entry for [`BloomSizing::Standard`].
pub const STANDARD_RATIO: usize = 32;

/// Counters per projected entry for [`BloomSizing::Small`].
pub const SMALL_RATIO: usize = 20;

/// Upper bound on probes per item.
pub const MAX_PROBES: usize = 64;

/// Longest n-gram the array backend will index.
pub const ARRAY_MAX_NGRAM: usize = 4;

/// Projected distinct `ngram`-grams, clamping long lengths to the last row.
#[must_use]
#[inline]
pub fn projected_entries(ngram: usize) -> usize {
    PROJECTED_ENTRIES[ngram.min(MAX_PROJECTED_NGRAM)]
}

/// Probes for a fixed counters-per-entry ratio: `⌈ln 2 × ratio⌉`.
///
/// ```
/// use ngramcraft::core::params::probes_for_ratio;
///
/// assert_eq!(probes_for_ratio(32), 23);
/// assert_eq!(probes_for_ratio(20), 14);
/// ```
#[must_use]
pub fn probes_for_ratio(ratio: usize) -> usize {
    ((LN_2 * ratio as f64).ceil() as usize).max(1)
}

/// How Bloom tables are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BloomSizing {
    /// 32 counters per projected entry, 23 probes.
    #[default]
    Standard,
    /// 20 counters per projected entry, 14 probes.
    Small,
    /// Fixed table size and probe count for every length.
    Explicit {
        /// Counters per table (`m`).
        counters: usize,
        /// Probes per item (`k`).
        probes: usize,
    },
}

/// Resolved size of one Bloom table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BloomParams {
    /// Counters in the table (`m`).
    pub counters: usize,
    /// Probes per item (`k`).
    pub probes: usize,
}

impl BloomSizing {
    /// Check explicit parameters. The projected sizings are always valid.
    ///
    /// # Errors
    ///
    /// [`NgramError::InvalidParameters`] if `counters == 0` or `probes` is
    /// outside `1..=MAX_PROBES`.
    pub fn validate(&self) -> Result<()> {
        if let Self::Explicit { counters, probes } = *self {
            if counters == 0 {
                return Err(NgramError::invalid_parameters(
                    "a Bloom table needs at least one counter",
                ));
            }
            if probes == 0 || probes > MAX_PROBES {
                return Err(NgramError::invalid_parameters(format!(
                    "probe count {probes} must be between 1 and {MAX_PROBES}"
                )));
            }
        }
        Ok(())
    }

    /// Table size and probe count for `ngram`-grams.
    ///
    /// # Errors
    ///
    /// [`NgramError::InvalidParameters`] for invalid explicit parameters or a
    /// table size that does not fit in `usize`.
    pub fn params(&self, ngram: usize) -> Result<BloomParams> {
        self.validate()?;
        let (ratio, explicit) = match *self {
            Self::Standard => (STANDARD_RATIO, None),
            Self::Small => (SMALL_RATIO, None),
            Self::Explicit { counters, probes } => (0, Some(BloomParams { counters, probes })),
        };
        if let Some(params) = explicit {
            return Ok(params);
        }

        let counters = projected_entries(ngram).checked_mul(ratio).ok_or_else(|| {
            NgramError::invalid_parameters(format!(
                "{ngram}-gram Bloom table does not fit in the address space"
            ))
        })?;
        Ok(BloomParams {
            counters: counters.max(1),
            probes: probes_for_ratio(ratio),
        })
    }
}

/// Cells in an array table for `ngram`-grams: `2^(8·ngram)`.
///
/// # Errors
///
/// [`NgramError::UnsupportedLength`] if `ngram` is zero, above
/// [`ARRAY_MAX_NGRAM`], or too large for this platform's `usize`.
pub fn array_counters(ngram: usize) -> Result<usize> {
    let unsupported = || NgramError::unsupported_length("array", ngram, ARRAY_MAX_NGRAM);
    if ngram == 0 || ngram > ARRAY_MAX_NGRAM {
        return Err(unsupported());
    }
    1usize
        .checked_shl((8 * ngram) as u32)
        .ok_or_else(unsupported)
}
