//! Inclusive n-gram length ranges.
//!
//! Every filter set tracks one filter per length in an [`NgramRange`]. The
//! range is validated once, on construction, so the rest of the crate can
//! index per-length storage with `n - min` without re-checking.

use crate::error::{NgramError, Result};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest allowed `max - min` for a range.
pub const MAX_RANGE_SPAN: usize = 20;

/// Inclusive range of n-gram lengths, `1 <= min <= max`, `max - min <= 20`.
///
/// # Examples
///
/// ```
/// use ngramcraft::NgramRange;
///
/// let range: NgramRange = "3-5".parse().unwrap();
/// assert_eq!(range.len(), 3);
/// assert_eq!(range.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RangeRepr", into = "RangeRepr"))]
pub struct NgramRange {
    min: usize,
    max: usize,
}

impl NgramRange {
    /// Create a validated range.
    ///
    /// # Errors
    ///
    /// [`NgramError::InvalidRange`] if `min == 0`, `max < min` or the range
    /// spans more than [`MAX_RANGE_SPAN`] lengths.
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(NgramError::invalid_range(min, max, "n-gram lengths start at 1"));
        }
        if max < min {
            return Err(NgramError::invalid_range(min, max, "max is below min"));
        }
        if max - min > MAX_RANGE_SPAN {
            return Err(NgramError::invalid_range(
                min,
                max,
                format!("too many n-gram sizes {} > {}", max - min, MAX_RANGE_SPAN),
            ));
        }
        Ok(Self { min, max })
    }

    /// A range holding exactly one length.
    ///
    /// # Errors
    ///
    /// [`NgramError::InvalidRange`] if `n == 0`.
    pub fn single(n: usize) -> Result<Self> {
        Self::new(n, n)
    }

    /// Smallest tracked length.
    #[must_use]
    #[inline]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Largest tracked length.
    #[must_use]
    #[inline]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Number of lengths in the range.
    #[must_use]
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        self.max - self.min + 1
    }

    /// Whether `n` is one of the tracked lengths.
    #[must_use]
    #[inline]
    pub const fn contains(&self, n: usize) -> bool {
        n >= self.min && n <= self.max
    }

    /// Position of length `n` within per-length storage.
    #[must_use]
    #[inline]
    pub const fn slot(&self, n: usize) -> Option<usize> {
        if self.contains(n) {
            Some(n - self.min)
        } else {
            None
        }
    }

    /// Iterate over the tracked lengths in increasing order.
    #[must_use]
    pub fn iter(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }

    /// The sub-range `[low, high]` intersected with this one, if non-empty.
    #[must_use]
    pub fn intersect(&self, low: usize, high: usize) -> Option<Self> {
        let min = self.min.max(low);
        let max = self.max.min(high);
        if min > max {
            None
        } else {
            Some(Self { min, max })
        }
    }

    /// Number of overlapping windows of every tracked length in a buffer of
    /// `len` bytes: `Σ (len - n + 1)` over lengths `n <= len`.
    #[must_use]
    pub fn window_count(&self, len: usize) -> u64 {
        self.iter()
            .filter(|&n| n <= len)
            .map(|n| (len - n + 1) as u64)
            .sum()
    }
}

impl fmt::Display for NgramRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for NgramRange {
    type Err = NgramError;

    /// Parse `"n"` or `"low-high"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parse = |part: &str| {
            part.trim().parse::<usize>().map_err(|_| {
                NgramError::invalid_range(0, 0, format!("cannot parse '{trimmed}' as a length range"))
            })
        };
        match trimmed.split_once('-') {
            Some((low, high)) => Self::new(parse(low)?, parse(high)?),
            None => Self::single(parse(trimmed)?),
        }
    }
}

impl IntoIterator for NgramRange {
    type Item = usize;
    type IntoIter = RangeInclusive<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Wire form used by serde so deserialized ranges are validated.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct RangeRepr {
    min: usize,
    max: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RangeRepr> for NgramRange {
    type Error = NgramError;

    fn try_from(repr: RangeRepr) -> Result<Self> {
        Self::new(repr.min, repr.max)
    }
}

#[cfg(feature = "serde")]
impl From<NgramRange> for RangeRepr {
    fn from(range: NgramRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let range = NgramRange::new(3, 5).unwrap();
        assert_eq!(range.min(), 3);
        assert_eq!(range.max(), 5);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_new_rejects_zero_min() {
        assert!(matches!(
            NgramRange::new(0, 3),
            Err(NgramError::InvalidRange { min: 0, max: 3, .. })
        ));
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(NgramRange::new(5, 3).is_err());
    }

    #[test]
    fn test_span_limit() {
        assert!(NgramRange::new(1, 21).is_ok());
        assert!(NgramRange::new(1, 22).is_err());
    }

    #[test]
    fn test_slot() {
        let range = NgramRange::new(2, 4).unwrap();
        assert_eq!(range.slot(2), Some(0));
        assert_eq!(range.slot(4), Some(2));
        assert_eq!(range.slot(1), None);
        assert_eq!(range.slot(5), None);
    }

    #[test]
    fn test_intersect() {
        let range = NgramRange::new(3, 8).unwrap();
        assert_eq!(range.intersect(5, 20), Some(NgramRange::new(5, 8).unwrap()));
        assert_eq!(range.intersect(0, 2), None);
        assert_eq!(range.intersect(4, 4), Some(NgramRange::single(4).unwrap()));
    }

    #[test]
    fn test_window_count() {
        let range = NgramRange::new(2, 4).unwrap();
        // 9 + 8 + 7
        assert_eq!(range.window_count(10), 24);
        // only 2- and 3-grams fit in 3 bytes
        assert_eq!(range.window_count(3), 3);
        assert_eq!(range.window_count(0), 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("4".parse::<NgramRange>().unwrap(), NgramRange::single(4).unwrap());
        assert_eq!(" 3 - 7 ".parse::<NgramRange>().unwrap(), NgramRange::new(3, 7).unwrap());
        assert!("x-3".parse::<NgramRange>().is_err());
        assert!("".parse::<NgramRange>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(NgramRange::new(1, 4).unwrap().to_string(), "1-4");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_validates() {
        let ok: NgramRange = serde_json::from_str(r#"{"min":2,"max":3}"#).unwrap();
        assert_eq!(ok, NgramRange::new(2, 3).unwrap());

        let bad: std::result::Result<NgramRange, _> = serde_json::from_str(r#"{"min":4,"max":1}"#);
        assert!(bad.is_err());
    }
}
