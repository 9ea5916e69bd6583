//! Filter shape descriptors.
//!
//! A driver that keeps counter tables in a named mapped region stores a
//! [`FilterLabel`] in the region's static header. A second process reads the
//! label first and learns which backend wrote the tables, the length range, and
//! each table's byte size and counts, before it attaches to the storage.

use crate::core::range::NgramRange;
use crate::ngram::backend::BackendKind;
use crate::ngram::LengthCounts;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Byte size and counts of one length's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LengthLabel {
    /// N-gram length.
    pub ngram: usize,
    /// Table size in bytes.
    pub bytes: usize,
    /// N-grams counted.
    pub total: u64,
    /// Distinct n-grams counted (an estimate for Bloom tables).
    pub distinct: u64,
}

impl From<LengthCounts> for LengthLabel {
    fn from(counts: LengthCounts) -> Self {
        Self {
            ngram: counts.ngram,
            bytes: counts.bytes,
            total: counts.tally.total,
            distinct: counts.tally.distinct,
        }
    }
}

/// Backend, length range and per-length sizes of a filter set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterLabel {
    /// Backend code: array 1, bloom 2, quotient 3, trie 4.
    pub code: u32,
    /// Tracked lengths.
    pub lengths: NgramRange,
    /// One entry per tracked length, shortest first.
    pub tables: Vec<LengthLabel>,
}

impl FilterLabel {
    /// Label a set of `kind` tables.
    #[must_use]
    pub fn new(kind: BackendKind, lengths: NgramRange, tables: Vec<LengthLabel>) -> Self {
        Self {
            code: kind.code(),
            lengths,
            tables,
        }
    }

    /// Backend named by the code, if the code is known.
    #[must_use]
    pub fn backend(&self) -> Option<BackendKind> {
        BackendKind::from_code(self.code)
    }

    /// Entry for `ngram`-grams.
    #[must_use]
    pub fn table(&self, ngram: usize) -> Option<&LengthLabel> {
        self.tables.iter().find(|table| table.ngram == ngram)
    }

    /// Sum of every table's byte size.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.tables.iter().map(|table| table.bytes).sum()
    }
}

impl fmt::Display for FilterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend() {
            Some(kind) => write!(f, "{kind}")?,
            None => write!(f, "unknown({})", self.code)?,
        }
        write!(f, " {}", self.lengths)?;
        for table in &self.tables {
            write!(
                f,
                "\n  ngram {}: {} bytes {} total {} distinct",
                table.ngram, table.bytes, table.total, table.distinct
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counter::TallySnapshot;

    fn label() -> FilterLabel {
        let tables = (3..=4)
            .map(|n| {
                LengthLabel::from(LengthCounts {
                    ngram: n,
                    counters: 100 * n,
                    bytes: 200 * n,
                    tally: TallySnapshot {
                        total: 10,
                        distinct: n as u64,
                        ..TallySnapshot::default()
                    },
                })
            })
            .collect();
        FilterLabel::new(BackendKind::Bloom, NgramRange::new(3, 4).unwrap(), tables)
    }

    #[test]
    fn test_label_lookup() {
        let label = label();
        assert_eq!(label.code, 2);
        assert_eq!(label.backend(), Some(BackendKind::Bloom));
        assert_eq!(label.table(4).unwrap().bytes, 800);
        assert_eq!(label.table(4).unwrap().distinct, 4);
        assert!(label.table(5).is_none());
        assert_eq!(label.total_bytes(), 1400);
    }

    #[test]
    fn test_label_display() {
        let text = label().to_string();
        assert!(text.starts_with("bloom 3-4"));
        assert!(text.contains("ngram 3: 600 bytes 10 total 3 distinct"));
    }

    #[test]
    fn test_unknown_code() {
        let mut label = label();
        label.code = 9;
        assert_eq!(label.backend(), None);
        assert!(label.to_string().starts_with("unknown(9)"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_label_json_round_trip() {
        let label = label();
        let json = serde_json::to_string(&label).unwrap();
        let back: FilterLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, label);
    }
}
