//! The n-gram filter-set interface.
//!
//! A filter set owns one counting filter per n-gram length in a configured
//! [`NgramRange`] and exposes whole-item operations that fan out across every
//! length. Callers only ever see the [`NgramFilterSet`] trait object; which
//! backend sits behind it is chosen once, at configuration time, through
//! [`backend()`](backend::backend).
//!
//! # Module Organization
//!
//! ```text
//! ngram/
//! ├── backend.rs   - BackendKind, NgramBackend, backend selection
//! ├── window.rs    - Full-window / ramp-down planning
//! ├── label.rs     - Shape descriptor for external storage
//! ├── session.rs   - Owned filter set with stream feeding and reports
//! └── mod.rs       - This file (the NgramFilterSet trait)
//! ```
//!
//! # Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`add_item`](NgramFilterSet::add_item) | count every n-gram of every tracked length |
//! | [`delete_item`](NgramFilterSet::delete_item) | undo an earlier `add_item` of the same bytes |
//! | [`find_ngram`](NgramFilterSet::find_ngram) | frequency of one n-gram |
//! | [`find_item`](NgramFilterSet::find_item) | summed frequency of every n-gram of an item |
//! | [`find_dist`](NgramFilterSet::find_dist) | statistics of an item's frequencies at one length |
//! | [`distribution`](NgramFilterSet::distribution) | statistics of a whole counter table |
//! | [`dump`](NgramFilterSet::dump) | human-readable table contents |
//! | [`close`](NgramFilterSet::close) | release every table |
//!
//! # Example
//!
//! ```
//! use ngramcraft::{BackendKind, NgramConfig};
//!
//! let set = NgramConfig::builder()
//!     .backend(BackendKind::Array)
//!     .lengths(1, 2)
//!     .build()
//!     .unwrap()
//!     .create()
//!     .unwrap();
//!
//! let summary = set.add_item(b"abab");
//! assert_eq!(summary.ngrams, 4 + 3);
//! assert_eq!(set.find_ngram(b"ab").unwrap(), 2);
//! assert_eq!(set.find_ngram(b"b").unwrap(), 2);
//! set.close();
//! ```

pub mod backend;
pub mod label;
pub mod session;
pub mod window;

pub use backend::{backend, BackendKind, BackendOptions, NgramBackend};
pub use label::{FilterLabel, LengthLabel};
pub use session::{LengthReport, NgramSession};
pub use window::{WindowPlan, WindowSpan};

use crate::core::counter::{ConcurrencyMode, TallySnapshot};
use crate::core::range::NgramRange;
use crate::error::Result;
use crate::stats::{DistributionStats, SeriesStats};
use std::fmt;
use std::io;
use std::ops::AddAssign;
use tracing::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Most windows of one item examined by [`NgramFilterSet::find_dist`].
pub const NGRAM_MAX: usize = 10_240;

/// What an add or delete did, summed over every length and window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateSummary {
    /// N-grams visited.
    pub ngrams: u64,
    /// Counter increments refused at the ceiling.
    pub overflows: u64,
    /// Counter decrements refused on saturated cells.
    pub underflows: u64,
    /// N-grams a delete could not find.
    pub not_found: u64,
}

impl UpdateSummary {
    /// True if any counter refused an update.
    #[must_use]
    pub fn saturated(&self) -> bool {
        self.overflows > 0 || self.underflows > 0
    }
}

impl AddAssign for UpdateSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.ngrams += rhs.ngrams;
        self.overflows += rhs.overflows;
        self.underflows += rhs.underflows;
        self.not_found += rhs.not_found;
    }
}

/// Size and running counts of one length's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LengthCounts {
    /// N-gram length.
    pub ngram: usize,
    /// Counter cells in the table.
    pub counters: usize,
    /// Table size in bytes.
    pub bytes: usize,
    /// Running counts for the table.
    pub tally: TallySnapshot,
}

/// A family of same-kind counting filters, one per tracked n-gram length.
///
/// Every method takes `&self`: in [`ConcurrencyMode::Shared`] a set can be
/// fed from several threads through an `Arc`.
pub trait NgramFilterSet: fmt::Debug + Send + Sync {
    /// Backend behind this set.
    fn kind(&self) -> backend::BackendKind;

    /// Tracked lengths.
    fn lengths(&self) -> NgramRange;

    /// Update mode of the counter tables.
    fn mode(&self) -> ConcurrencyMode;

    /// Count the n-grams of `chunk` that reach past its first `carried`
    /// bytes, which were counted as the tail of the previous chunk.
    fn add_chunk(&self, chunk: &[u8], carried: usize) -> UpdateSummary;

    /// Count every n-gram of `item` at every tracked length.
    fn add_item(&self, item: &[u8]) -> UpdateSummary {
        self.add_chunk(item, 0)
    }

    /// Remove every n-gram of `item` at every tracked length.
    fn delete_item(&self, item: &[u8]) -> UpdateSummary;

    /// Frequency of one n-gram; its length selects the table.
    ///
    /// # Errors
    ///
    /// [`NgramError::LengthNotTracked`](crate::NgramError::LengthNotTracked)
    /// if `window.len()` is outside the tracked range.
    fn find_ngram(&self, window: &[u8]) -> Result<u64>;

    /// Summed frequency of every n-gram of `item` at every tracked length.
    fn find_item(&self, item: &[u8]) -> u64;

    /// Frequencies of `item`'s first [`NGRAM_MAX`] `ngram`-grams, summarized.
    ///
    /// # Errors
    ///
    /// [`NgramError::LengthNotTracked`](crate::NgramError::LengthNotTracked)
    /// if `ngram` is outside the tracked range.
    fn find_dist(&self, item: &[u8], ngram: usize) -> Result<SeriesStats>;

    /// Statistics of the whole `ngram`-gram counter table.
    ///
    /// # Errors
    ///
    /// [`NgramError::LengthNotTracked`](crate::NgramError::LengthNotTracked)
    /// if `ngram` is outside the tracked range.
    fn distribution(&self, ngram: usize) -> Result<DistributionStats>;

    /// Size and running counts of the `ngram`-gram table.
    ///
    /// # Errors
    ///
    /// [`NgramError::LengthNotTracked`](crate::NgramError::LengthNotTracked)
    /// if `ngram` is outside the tracked range.
    fn counts(&self, ngram: usize) -> Result<LengthCounts>;

    /// Running counts summed over every length.
    fn totals(&self) -> TallySnapshot {
        let mut totals = TallySnapshot::default();
        for n in self.lengths() {
            if let Ok(counts) = self.counts(n) {
                totals += counts.tally;
            }
        }
        totals
    }

    /// Shape descriptor for external storage.
    fn label(&self) -> FilterLabel {
        let lengths = self
            .lengths()
            .iter()
            .filter_map(|n| self.counts(n).ok())
            .map(LengthLabel::from)
            .collect();
        FilterLabel::new(self.kind(), self.lengths(), lengths)
    }

    /// Write the table contents; higher `verbosity` lists more cells.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    fn dump(&self, out: &mut dyn io::Write, verbosity: u8) -> io::Result<()>;

    /// Release every table.
    fn close(self: Box<Self>) {
        let totals = self.totals();
        info!(
            backend = %self.kind(),
            lengths = %self.lengths(),
            total = totals.total,
            distinct = totals.distinct,
            overflows = totals.overflows,
            underflows = totals.underflows,
            "closing n-gram filter set"
        );
        drop(self);
    }
}
