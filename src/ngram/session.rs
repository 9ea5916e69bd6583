//! An owned filter set with stream feeding and reports.
//!
//! [`NgramSession`] wraps the `Box<dyn NgramFilterSet>` a configuration
//! produces and adds the driver-level conveniences on top of the backend
//! operations: chunked reading from any [`io::Read`], per-length summary
//! reports, and logging on close.
//!
//! # Streams
//!
//! A stream is read `chunk_size` bytes at a time. After each chunk the last
//! `max - 1` bytes are kept and prepended to the next one, so n-grams that
//! straddle a chunk boundary are seen whole. The kept bytes are passed to the
//! backend as `carried`, and every n-gram that lies entirely inside them is
//! skipped because it was already counted with the previous chunk.
//!
//! ```text
//! range 1-3, chunks "abcd" | "ef"
//!
//! chunk 1  "abcd"      a b c d ab bc cd abc bcd
//! chunk 2  "cd" + "ef"  e f de ef cde def           (c, d, cd skipped)
//! ```

use crate::ngram::label::FilterLabel;
use crate::ngram::{NgramFilterSet, UpdateSummary};
use std::fmt;
use std::io::{self, Read};
use std::ops::Deref;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default read size for [`NgramSession::add_stream`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest read size [`NgramSession::add_stream`] will buffer; larger
/// requests are clamped to it.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Summary statistics of one length's counter table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LengthReport {
    /// N-gram length.
    pub ngram: usize,
    /// Mean counter value.
    pub mean: f64,
    /// Sample standard deviation of the counters.
    pub std_dev: f64,
    /// Largest counter.
    pub max: u64,
    /// Smallest counter.
    pub min: u64,
    /// `σ² / μ`, absent for an empty table.
    pub dispersion: Option<f64>,
    /// Chi-square against uniform occupancy, absent for an empty table.
    pub chi_square: Option<f64>,
}

impl fmt::Display for LengthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ngram {}: mean {:.6} sd {:.6} max {} min {}",
            self.ngram, self.mean, self.std_dev, self.max, self.min
        )?;
        if let Some(dispersion) = self.dispersion {
            write!(f, " s2/m {dispersion:.6}")?;
        }
        if let Some(chi_square) = self.chi_square {
            write!(f, " chi2 {chi_square:.3}")?;
        }
        Ok(())
    }
}

/// A filter set owned for the lifetime of one counting run.
///
/// Dereferences to the underlying [`NgramFilterSet`], so every backend
/// operation is available directly.
///
/// ```
/// use ngramcraft::{BackendKind, NgramConfig};
///
/// let session = NgramConfig::builder()
///     .backend(BackendKind::Array)
///     .lengths(1, 2)
///     .build()
///     .unwrap()
///     .session()
///     .unwrap();
///
/// let summary = session.add_stream(&b"abcabc"[..], 4).unwrap();
/// assert_eq!(summary.ngrams, 6 + 5);
/// assert_eq!(session.find_ngram(b"ca").unwrap(), 1);
/// assert_eq!(session.report().len(), 2);
/// session.close();
/// ```
pub struct NgramSession {
    set: Box<dyn NgramFilterSet>,
}

impl NgramSession {
    /// Take ownership of a filter set.
    #[must_use]
    pub fn new(set: Box<dyn NgramFilterSet>) -> Self {
        Self { set }
    }

    /// The filter set.
    #[must_use]
    pub fn set(&self) -> &dyn NgramFilterSet {
        self.set.as_ref()
    }

    /// Give the filter set back without closing it.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn NgramFilterSet> {
        self.set
    }

    /// Bytes kept between chunks: one less than the longest tracked length.
    #[must_use]
    pub fn overlap(&self) -> usize {
        self.set.lengths().max() - 1
    }

    /// Count every n-gram of a stream, reading `chunk_size` bytes at a time.
    ///
    /// The result is the same as a single `add_item` over the whole stream.
    /// `chunk_size` is clamped to `1..=`[`MAX_CHUNK_SIZE`].
    ///
    /// # Errors
    ///
    /// Any read error other than [`io::ErrorKind::Interrupted`]. Chunks
    /// counted before the error stay counted.
    pub fn add_stream<R: Read>(&self, mut reader: R, chunk_size: usize) -> io::Result<UpdateSummary> {
        let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        let overlap = self.overlap();
        let mut buf: Vec<u8> = Vec::with_capacity(overlap + chunk_size);
        let mut carried = 0;
        let mut summary = UpdateSummary::default();
        let mut chunks = 0u64;

        loop {
            let start = buf.len();
            buf.resize(start + chunk_size, 0);
            let read = match reader.read(&mut buf[start..]) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    buf.truncate(start);
                    continue;
                }
                Err(e) => return Err(e),
            };
            buf.truncate(start + read);
            if read == 0 {
                break;
            }

            summary += self.set.add_chunk(&buf, carried);
            chunks += 1;

            let consumed = buf.len().saturating_sub(overlap);
            buf.drain(..consumed);
            carried = buf.len();
        }

        debug!(
            chunks,
            ngrams = summary.ngrams,
            overflows = summary.overflows,
            "counted stream"
        );
        Ok(summary)
    }

    /// Summary statistics for every tracked length, shortest first.
    pub fn report(&self) -> Vec<LengthReport> {
        self.set
            .lengths()
            .iter()
            .filter_map(|ngram| {
                let stats = self.set.distribution(ngram).ok()?;
                let report = LengthReport {
                    ngram,
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                    max: stats.max,
                    min: stats.min,
                    dispersion: stats.dispersion(),
                    chi_square: stats.chi_square,
                };
                info!(
                    backend = %self.set.kind(),
                    ngram,
                    mean = report.mean,
                    std_dev = report.std_dev,
                    max = report.max,
                    min = report.min,
                    dispersion = ?report.dispersion,
                    chi_square = ?report.chi_square,
                    "n-gram table report"
                );
                Some(report)
            })
            .collect()
    }

    /// Shape descriptor of the filter set.
    #[must_use]
    pub fn label(&self) -> FilterLabel {
        self.set.label()
    }

    /// Release every table.
    pub fn close(self) {
        self.set.close();
    }
}

impl Deref for NgramSession {
    type Target = dyn NgramFilterSet;

    fn deref(&self) -> &Self::Target {
        self.set.as_ref()
    }
}

impl fmt::Debug for NgramSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NgramSession")
            .field("backend", &self.set.kind())
            .field("lengths", &self.set.lengths())
            .field("mode", &self.set.mode())
            .finish()
    }
}
