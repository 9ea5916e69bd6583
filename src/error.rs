//! Error types for n-gram counting operations.
//!
//! Only conditions that stop an operation from happening at all are errors:
//! bad configuration, an unimplemented backend, or a counter table that could
//! not be allocated. Counter saturation, refused decrements and deletes of
//! absent items are ordinary outcomes and are reported through
//! [`UpdateSummary`](crate::ngram::UpdateSummary) and
//! [`Removal`](crate::filters::Removal) instead.
//!
//! # Error Propagation
//!
//! ```
//! use ngramcraft::{NgramRange, Result};
//!
//! fn widest(low: usize, high: usize) -> Result<usize> {
//!     let range = NgramRange::new(low, high)?;
//!     Ok(range.max())
//! }
//! # assert_eq!(widest(3, 5).unwrap(), 5);
//! # assert!(widest(5, 3).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NgramError>;

/// Errors that can occur while configuring or allocating n-gram filters.
///
/// `Clone` + `PartialEq` so tests can compare errors directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NgramError {
    /// The n-gram length range is malformed or too wide.
    #[error("Invalid n-gram range {min}-{max}: {reason}.")]
    InvalidRange {
        /// Lower bound that was requested.
        min: usize,
        /// Upper bound that was requested.
        max: usize,
        /// Why the range was rejected.
        reason: String,
    },

    /// A counter table could not be allocated.
    ///
    /// Any tables that were already allocated for the same filter set have been
    /// returned to their allocator by the time this error is observed.
    #[error("Failed to allocate {counters} counters ({bytes} bytes) for the {ngram}-gram table.")]
    AllocationFailed {
        /// N-gram length the table was for.
        ngram: usize,
        /// Number of counters requested.
        counters: usize,
        /// Number of bytes requested.
        bytes: usize,
    },

    /// A bounded allocator refused a request that would exceed its budget.
    #[error("Allocating {requested} bytes for the {ngram}-gram table would exceed the {limit} byte budget ({in_use} in use).")]
    AllocationBudgetExceeded {
        /// N-gram length the table was for.
        ngram: usize,
        /// Bytes requested.
        requested: usize,
        /// Bytes already in use.
        in_use: usize,
        /// Configured budget.
        limit: usize,
    },

    /// The backend name is not recognised.
    #[error("Unknown n-gram filter '{name}'. Expected one of: array, bloom, quotient, trie.")]
    UnknownBackend {
        /// The name that was given.
        name: String,
    },

    /// The backend is recognised but has no implementation.
    #[error("The '{backend}' n-gram filter is not implemented.")]
    UnimplementedBackend {
        /// Name of the backend.
        backend: &'static str,
    },

    /// Backend parameters are invalid.
    #[error("Invalid n-gram filter parameters: {message}.")]
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// A per-length operation named a length outside the configured range.
    #[error("{ngram}-grams are not tracked by this filter set (range {min}-{max}).")]
    LengthNotTracked {
        /// Length that was asked for.
        ngram: usize,
        /// Configured lower bound.
        min: usize,
        /// Configured upper bound.
        max: usize,
    },

    /// The backend cannot represent n-grams of this length.
    #[error("The {backend} filter cannot track {ngram}-grams (maximum {limit}).")]
    UnsupportedLength {
        /// Name of the backend.
        backend: &'static str,
        /// Length that was asked for.
        ngram: usize,
        /// Largest supported length.
        limit: usize,
    },
}

impl NgramError {
    /// Create an `InvalidRange` error.
    #[must_use]
    pub fn invalid_range(min: usize, max: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            min,
            max,
            reason: reason.into(),
        }
    }

    /// Create an `AllocationFailed` error.
    #[must_use]
    pub fn allocation_failed(ngram: usize, counters: usize, bytes: usize) -> Self {
        Self::AllocationFailed {
            ngram,
            counters,
            bytes,
        }
    }

    /// Create an `AllocationBudgetExceeded` error.
    #[must_use]
    pub fn budget_exceeded(ngram: usize, requested: usize, in_use: usize, limit: usize) -> Self {
        Self::AllocationBudgetExceeded {
            ngram,
            requested,
            in_use,
            limit,
        }
    }

    /// Create an `UnknownBackend` error.
    #[must_use]
    pub fn unknown_backend(name: impl Into<String>) -> Self {
        Self::UnknownBackend { name: name.into() }
    }

    /// Create an `UnimplementedBackend` error.
    #[must_use]
    pub fn unimplemented_backend(backend: &'static str) -> Self {
        Self::UnimplementedBackend { backend }
    }

    /// Create an `InvalidParameters` error with a formatted message.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a `LengthNotTracked` error.
    #[must_use]
    pub fn length_not_tracked(ngram: usize, min: usize, max: usize) -> Self {
        Self::LengthNotTracked { ngram, min, max }
    }

    /// Create an `UnsupportedLength` error.
    #[must_use]
    pub fn unsupported_length(backend: &'static str, ngram: usize, limit: usize) -> Self {
        Self::UnsupportedLength {
            backend,
            ngram,
            limit,
        }
    }

    /// True for errors raised while allocating counter storage.
    #[must_use]
    pub fn is_allocation(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::AllocationBudgetExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_range() {
        let err = NgramError::invalid_range(5, 3, "max is below min");
        let display = format!("{err}");
        assert!(display.contains("5-3"));
        assert!(display.contains("max is below min"));
        assert!(display.ends_with('.'));
    }

    #[test]
    fn test_error_display_allocation_failed() {
        let err = NgramError::allocation_failed(4, 1 << 32, 1 << 33);
        let display = format!("{err}");
        assert!(display.contains("4-gram"));
        assert!(display.contains(&(1u64 << 33).to_string()));
    }

    #[test]
    fn test_error_display_budget_exceeded() {
        let err = NgramError::budget_exceeded(3, 100, 50, 120);
        let display = format!("{err}");
        assert!(display.contains("100 bytes"));
        assert!(display.contains("120 byte budget"));
        assert!(display.contains("50 in use"));
    }

    #[test]
    fn test_error_display_backends() {
        let unknown = NgramError::unknown_backend("cuckoo");
        assert!(format!("{unknown}").contains("cuckoo"));

        let missing = NgramError::unimplemented_backend("quotient");
        assert!(format!("{missing}").contains("quotient"));
        assert!(format!("{missing}").contains("not implemented"));
    }

    #[test]
    fn test_error_display_length_not_tracked() {
        let err = NgramError::length_not_tracked(7, 3, 5);
        let display = format!("{err}");
        assert!(display.contains("7-grams"));
        assert!(display.contains("3-5"));
    }

    #[test]
    fn test_is_allocation() {
        assert!(NgramError::allocation_failed(1, 256, 512).is_allocation());
        assert!(NgramError::budget_exceeded(1, 512, 0, 10).is_allocation());
        assert!(!NgramError::invalid_parameters("k").is_allocation());
    }

    #[test]
    fn test_error_implements_std_error() {
        let _err: Box<dyn std::error::Error> = Box::new(NgramError::invalid_parameters("test"));
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(NgramError::unimplemented_backend("trie"))
        }

        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        assert_eq!(outer(), Err(NgramError::unimplemented_backend("trie")));
    }
}
