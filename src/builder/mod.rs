//! Configuration of n-gram filter sets.
//!
//! A filter set is configured once, before any counting: which backend, which
//! n-gram lengths, how Bloom tables are sized, how counters are updated and
//! where their storage comes from. [`NgramConfigBuilder`] collects those
//! choices and [`build`](NgramConfigBuilder::build) validates them all, so an
//! unimplemented backend or an impossible size is rejected before a single
//! byte is allocated.
//!
//! # Error Handling
//!
//! - **Configuration errors** (`build`): unknown or unimplemented backend,
//!   malformed range, array lengths above 4, invalid explicit Bloom sizing
//! - **Allocation errors** (`create`): a counter table could not be obtained
//!
//! # Examples
//!
//! ## Array Backend
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
//! set.add_item(b"payload");
//! assert_eq!(set.find_ngram(b"a").unwrap(), 2);
//! ```
//!
//! ## Bloom Backend With a Memory Budget
//!
//! ```
//! use ngramcraft::core::{BloomSizing, BoundedAllocator, ConcurrencyMode};
//! use ngramcraft::{BackendKind, NgramConfig};
//! use std::sync::Arc;
//!
//! let budget = Arc::new(BoundedAllocator::new(1 << 20));
//! let config = NgramConfig::builder()
//!     .backend(BackendKind::Bloom)
//!     .lengths(3, 5)
//!     .sizing(BloomSizing::Explicit { counters: 1 << 16, probes: 7 })
//!     .mode(ConcurrencyMode::Shared)
//!     .allocator(budget.clone())
//!     .build()
//!     .unwrap();
//!
//! let set = config.create().unwrap();
//! assert_eq!(budget.usage().in_use, 3 * (1 << 17));
//! set.close();
//! assert_eq!(budget.usage().in_use, 0);
//! ```
//!
//! ## From Settings
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # {
//! use ngramcraft::builder::NgramSettings;
//!
//! let settings: NgramSettings = serde_json::from_str(
//!     r#"{ "backend": "bloom", "lengths": "3-5", "sizing": "small" }"#,
//! ).unwrap();
//! let config = settings.into_builder().unwrap().build().unwrap();
//! assert_eq!(config.range().max(), 5);
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

use crate::core::alloc::{CounterAllocator, HeapAllocator};
use crate::core::counter::ConcurrencyMode;
use crate::core::params::BloomSizing;
use crate::core::range::NgramRange;
use crate::error::{NgramError, Result};
use crate::ngram::backend::{backend, BackendKind, BackendOptions};
use crate::ngram::{NgramFilterSet, NgramSession};
use std::sync::Arc;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A validated filter-set configuration.
///
/// Cheap to clone; each [`create`](Self::create) allocates a fresh set.
#[derive(Debug, Clone)]
pub struct NgramConfig {
    kind: BackendKind,
    range: NgramRange,
    options: BackendOptions,
}

impl NgramConfig {
    /// Start a configuration.
    #[must_use]
    pub fn builder() -> NgramConfigBuilder {
        NgramConfigBuilder::new()
    }

    /// Selected backend.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.kind
    }

    /// Tracked lengths.
    #[must_use]
    pub fn range(&self) -> NgramRange {
        self.range
    }

    /// Sizing, mode and allocator.
    #[must_use]
    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Allocate a filter set.
    ///
    /// # Errors
    ///
    /// An allocation error if any table could not be obtained; tables
    /// allocated before the failure are released.
    pub fn create(&self) -> Result<Box<dyn NgramFilterSet>> {
        backend(self.kind)
            .create(self.range, &self.options)
            .map_err(|e| {
                warn!(
                    backend = %self.kind,
                    lengths = %self.range,
                    error = %e,
                    "failed to create n-gram filter set"
                );
                e
            })
    }

    /// Allocate a filter set wrapped in an [`NgramSession`].
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn session(&self) -> Result<NgramSession> {
        self.create().map(NgramSession::new)
    }

    /// The serializable part of this configuration.
    #[must_use]
    pub fn settings(&self) -> NgramSettings {
        NgramSettings {
            backend: self.kind.name().to_string(),
            lengths: self.range.to_string(),
            sizing: self.options.sizing,
            mode: self.options.mode,
        }
    }
}

/// Builder for [`NgramConfig`].
///
/// Only the length range is required. Defaults: Bloom backend,
/// [`BloomSizing::Standard`], [`ConcurrencyMode::Exclusive`], heap storage.
#[derive(Clone)]
#[must_use]
pub struct NgramConfigBuilder {
    kind: BackendKind,
    lengths: Option<(usize, usize)>,
    sizing: BloomSizing,
    mode: ConcurrencyMode,
    allocator: Arc<dyn CounterAllocator>,
}

impl NgramConfigBuilder {
    /// Builder with every default and no length range.
    pub fn new() -> Self {
        Self {
            kind: BackendKind::default(),
            lengths: None,
            sizing: BloomSizing::default(),
            mode: ConcurrencyMode::default(),
            allocator: Arc::new(HeapAllocator),
        }
    }

    /// Select the backend.
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Track lengths `min..=max`. Validated by [`build`](Self::build).
    pub fn lengths(mut self, min: usize, max: usize) -> Self {
        self.lengths = Some((min, max));
        self
    }

    /// Track an already validated range.
    pub fn range(mut self, range: NgramRange) -> Self {
        self.lengths = Some((range.min(), range.max()));
        self
    }

    /// Bloom table sizing. Ignored by the array backend.
    pub fn sizing(mut self, sizing: BloomSizing) -> Self {
        self.sizing = sizing;
        self
    }

    /// Counter update mode.
    pub fn mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Source of counter storage.
    pub fn allocator(mut self, allocator: Arc<dyn CounterAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`NgramError::InvalidParameters`] if no range was given
    /// - [`NgramError::InvalidRange`] for a malformed range
    /// - [`NgramError::UnimplementedBackend`] for quotient and trie
    /// - [`NgramError::UnsupportedLength`] for array lengths above 4
    /// - [`NgramError::InvalidParameters`] for invalid explicit Bloom sizing
    pub fn build(self) -> Result<NgramConfig> {
        let kind = self.kind;
        let reject = |e: NgramError| {
            warn!(backend = %kind, error = %e, "rejected n-gram filter configuration");
            e
        };

        let (min, max) = self
            .lengths
            .ok_or_else(|| NgramError::invalid_parameters("no n-gram length range configured"))
            .map_err(reject)?;
        let range = NgramRange::new(min, max).map_err(reject)?;
        let options = BackendOptions {
            sizing: self.sizing,
            mode: self.mode,
            allocator: self.allocator,
        };
        backend(kind).validate(range, &options).map_err(reject)?;

        Ok(NgramConfig {
            kind,
            range,
            options,
        })
    }
}

impl Default for NgramConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NgramConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NgramConfigBuilder")
            .field("kind", &self.kind)
            .field("lengths", &self.lengths)
            .field("sizing", &self.sizing)
            .field("mode", &self.mode)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

/// Configuration in the driver's textual form, for loading from files.
///
/// `backend` is parsed like [`BackendKind::from_str`](std::str::FromStr) and
/// `lengths` like [`NgramRange`] (`"3-5"` or `"4"`). The allocator is not
/// part of the settings; it defaults to the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NgramSettings {
    /// Backend name.
    pub backend: String,
    /// Length range.
    pub lengths: String,
    /// Bloom table sizing.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sizing: BloomSizing,
    /// Counter update mode.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: ConcurrencyMode,
}

impl NgramSettings {
    /// A builder preloaded with these settings.
    ///
    /// # Errors
    ///
    /// [`NgramError::UnknownBackend`] or [`NgramError::InvalidRange`] if a
    /// field does not parse.
    pub fn into_builder(self) -> Result<NgramConfigBuilder> {
        let kind: BackendKind = self.backend.parse()?;
        let range: NgramRange = self.lengths.parse()?;
        Ok(NgramConfigBuilder::new()
            .backend(kind)
            .range(range)
            .sizing(self.sizing)
            .mode(self.mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alloc::BoundedAllocator;

    #[test]
    fn test_defaults() {
        let config = NgramConfig::builder().lengths(3, 5).build().unwrap();
        assert_eq!(config.backend(), BackendKind::Bloom);
        assert_eq!(config.range(), NgramRange::new(3, 5).unwrap());
        assert_eq!(config.options().sizing, BloomSizing::Standard);
        assert_eq!(config.options().mode, ConcurrencyMode::Exclusive);
        assert_eq!(config.options().allocator.name(), "heap");
    }

    #[test]
    fn test_missing_range() {
        let err = NgramConfig::builder().build().unwrap_err();
        assert!(matches!(err, NgramError::InvalidParameters { .. }));
    }

    #[test]
    fn test_bad_range() {
        assert!(matches!(
            NgramConfig::builder().lengths(5, 3).build(),
            Err(NgramError::InvalidRange { .. })
        ));
        assert!(matches!(
            NgramConfig::builder().lengths(0, 3).build(),
            Err(NgramError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_unimplemented_rejected_at_build() {
        for kind in [BackendKind::Quotient, BackendKind::Trie] {
            let err = NgramConfig::builder()
                .backend(kind)
                .lengths(3, 5)
                .build()
                .unwrap_err();
            assert_eq!(err, NgramError::unimplemented_backend(kind.name()));
        }
    }

    #[test]
    fn test_array_length_limit() {
        let err = NgramConfig::builder()
            .backend(BackendKind::Array)
            .lengths(2, 5)
            .build()
            .unwrap_err();
        assert_eq!(err, NgramError::unsupported_length("array", 5, 4));
    }

    #[test]
    fn test_explicit_sizing_validated() {
        let err = NgramConfig::builder()
            .lengths(3, 3)
            .sizing(BloomSizing::Explicit {
                counters: 1000,
                probes: 0,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, NgramError::InvalidParameters { .. }));
    }

    #[test]
    fn test_create_with_budget() {
        let budget = Arc::new(BoundedAllocator::new(2000));
        let config = NgramConfig::builder()
            .lengths(3, 4)
            .sizing(BloomSizing::Explicit {
                counters: 400,
                probes: 3,
            })
            .allocator(budget.clone())
            .build()
            .unwrap();

        let first = config.create().unwrap();
        assert_eq!(budget.usage().in_use, 1600);
        let err = config.create().unwrap_err();
        assert!(err.is_allocation());
        drop(first);
        assert_eq!(budget.usage().in_use, 0);
        assert!(config.create().is_ok());
    }

    #[test]
    fn test_session_from_config() {
        let session = NgramConfig::builder()
            .backend(BackendKind::Array)
            .lengths(1, 1)
            .mode(ConcurrencyMode::Shared)
            .build()
            .unwrap()
            .session()
            .unwrap();
        assert_eq!(session.mode(), ConcurrencyMode::Shared);
        session.add_item(b"xx");
        assert_eq!(session.find_ngram(b"x").unwrap(), 2);
    }

    #[test]
    fn test_settings_round_trip() {
        let config = NgramConfig::builder()
            .lengths(2, 6)
            .sizing(BloomSizing::Small)
            .build()
            .unwrap();
        let settings = config.settings();
        assert_eq!(settings.backend, "bloom");
        assert_eq!(settings.lengths, "2-6");

        let rebuilt = settings.into_builder().unwrap().build().unwrap();
        assert_eq!(rebuilt.range(), config.range());
        assert_eq!(rebuilt.options().sizing, BloomSizing::Small);
    }

    #[test]
    fn test_settings_parse_errors() {
        let unknown = NgramSettings {
            backend: "cuckoo".into(),
            lengths: "3".into(),
            sizing: BloomSizing::default(),
            mode: ConcurrencyMode::default(),
        };
        assert_eq!(
            unknown.into_builder().unwrap_err(),
            NgramError::unknown_backend("cuckoo")
        );

        let bad_range = NgramSettings {
            backend: "Array".into(),
            lengths: "x-y".into(),
            sizing: BloomSizing::default(),
            mode: ConcurrencyMode::default(),
        };
        assert!(bad_range.into_builder().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_json() {
        let settings: NgramSettings = serde_json::from_str(
            r#"{
                "backend": "BloomFilter",
                "lengths": "4",
                "sizing": { "explicit": { "counters": 2048, "probes": 5 } },
                "mode": "shared"
            }"#,
        )
        .unwrap();
        let config = settings.into_builder().unwrap().build().unwrap();
        assert_eq!(config.backend(), BackendKind::Bloom);
        assert_eq!(config.range(), NgramRange::single(4).unwrap());
        assert_eq!(
            config.options().sizing,
            BloomSizing::Explicit {
                counters: 2048,
                probes: 5
            }
        );
        assert_eq!(config.options().mode, ConcurrencyMode::Shared);
    }
}
