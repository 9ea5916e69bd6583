//! Planning which n-grams of a buffer to visit.
//!
//! For a buffer of `L` bytes and a range `[min, max]`, every offset `i` starts
//! one n-gram of each length `n` with `i + n <= L`:
//!
//! ```text
//! offset i:   lengths [min, min(max, L - i)]
//!
//! "abcdef", range 2-4
//!   i=0  ab abc abcd     full window
//!   i=1  bc bcd bcde     full window
//!   i=2  cd cde cdef     full window
//!   i=3  de def          ramp-down
//!   i=4  ef              ramp-down
//! ```
//!
//! While `i + max <= L` the whole range fits (the full-window pass); after
//! that the usable maximum shrinks by one per offset (the ramp-down pass).
//! Buffers shorter than `max` start directly in the ramp-down.
//!
//! When a stream is fed in chunks, the first `carried` bytes of a chunk are the
//! tail of the previous one. Their n-grams were already counted, so a window
//! is only visited if it reaches past them (`i + n > carried`).

use crate::core::range::NgramRange;

/// The lengths to visit at one offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    /// Start of the n-grams in the buffer.
    pub offset: usize,
    /// Shortest length to visit.
    pub min: usize,
    /// Longest length to visit.
    pub max: usize,
}

impl WindowSpan {
    /// Number of lengths in the span.
    #[must_use]
    #[inline]
    pub const fn lengths(&self) -> usize {
        self.max - self.min + 1
    }
}

/// Iterator over the [`WindowSpan`]s of one buffer.
///
/// ```
/// use ngramcraft::ngram::window::WindowPlan;
/// use ngramcraft::NgramRange;
///
/// let range = NgramRange::new(2, 4).unwrap();
/// let spans: Vec<(usize, usize, usize)> = WindowPlan::new(range, 6, 0)
///     .map(|s| (s.offset, s.min, s.max))
///     .collect();
/// assert_eq!(spans, vec![(0, 2, 4), (1, 2, 4), (2, 2, 4), (3, 2, 3), (4, 2, 2)]);
/// ```
#[derive(Debug, Clone)]
pub struct WindowPlan {
    range: NgramRange,
    len: usize,
    carried: usize,
    offset: usize,
}

impl WindowPlan {
    /// Plan a buffer of `len` bytes whose first `carried` bytes were already
    /// counted.
    #[must_use]
    pub fn new(range: NgramRange, len: usize, carried: usize) -> Self {
        Self {
            range,
            len,
            carried: carried.min(len),
            offset: 0,
        }
    }

    /// Total n-grams the plan visits.
    #[must_use]
    pub fn window_count(&self) -> u64 {
        self.clone().map(|span| span.lengths() as u64).sum()
    }
}

impl Iterator for WindowPlan {
    type Item = WindowSpan;

    fn next(&mut self) -> Option<WindowSpan> {
        while self.offset + self.range.min() <= self.len {
            let offset = self.offset;
            self.offset += 1;

            let max = self.range.max().min(self.len - offset);
            let min = self.range.min().max(first_counted_length(offset, self.carried));
            if min <= max {
                return Some(WindowSpan { offset, min, max });
            }
        }
        None
    }
}

/// Shortest length starting at `offset` that reaches past `carried` bytes.
#[must_use]
#[inline]
pub const fn first_counted_length(offset: usize, carried: usize) -> usize {
    if offset >= carried {
        1
    } else {
        carried - offset + 1
    }
}

/// First offset whose `n`-gram reaches past `carried` bytes.
#[must_use]
#[inline]
pub const fn first_counted_offset(n: usize, carried: usize) -> usize {
    (carried + 1).saturating_sub(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: usize, max: usize) -> NgramRange {
        NgramRange::new(min, max).unwrap()
    }

    fn spans(r: NgramRange, len: usize, carried: usize) -> Vec<(usize, usize, usize)> {
        WindowPlan::new(r, len, carried)
            .map(|s| (s.offset, s.min, s.max))
            .collect()
    }

    #[test]
    fn test_full_then_ramp_down() {
        assert_eq!(
            spans(range(1, 3), 4, 0),
            vec![(0, 1, 3), (1, 1, 3), (2, 1, 2), (3, 1, 1)]
        );
    }

    #[test]
    fn test_buffer_shorter_than_max() {
        assert_eq!(spans(range(2, 5), 3, 0), vec![(0, 2, 3), (1, 2, 2)]);
    }

    #[test]
    fn test_buffer_shorter_than_min() {
        assert!(spans(range(3, 5), 2, 0).is_empty());
        assert!(spans(range(1, 1), 0, 0).is_empty());
    }

    #[test]
    fn test_exact_coverage_count() {
        for len in 0..40 {
            for (lo, hi) in [(1, 1), (1, 4), (3, 5), (2, 10)] {
                let r = range(lo, hi);
                assert_eq!(
                    WindowPlan::new(r, len, 0).window_count(),
                    r.window_count(len),
                    "len={len} range={r}"
                );
            }
        }
    }

    #[test]
    fn test_carried_prefix_skips_counted_windows() {
        // "abcdef" with "ab" carried from the previous chunk, range 1-3:
        // a, b, ab were counted before.
        assert_eq!(
            spans(range(1, 3), 6, 2),
            vec![(0, 3, 3), (1, 2, 3), (2, 1, 3), (3, 1, 3), (4, 1, 2), (5, 1, 1)]
        );
    }

    #[test]
    fn test_carried_counts_only_new_windows() {
        let r = range(2, 4);
        // Counting a 10 byte stream as 7 bytes, then 3 more with 3 carried,
        // equals counting it in one go.
        let first = WindowPlan::new(r, 7, 0).window_count();
        let second = WindowPlan::new(r, 6, 3).window_count();
        assert_eq!(first + second, r.window_count(10));
    }

    #[test]
    fn test_carried_whole_buffer() {
        assert!(spans(range(1, 3), 3, 3).is_empty());
        assert!(spans(range(1, 3), 3, 10).is_empty());
    }

    #[test]
    fn test_first_counted_helpers() {
        assert_eq!(first_counted_length(0, 0), 1);
        assert_eq!(first_counted_length(1, 3), 3);
        assert_eq!(first_counted_offset(2, 3), 2);
        assert_eq!(first_counted_offset(5, 3), 0);
        assert_eq!(first_counted_offset(1, 0), 0);
    }
}
