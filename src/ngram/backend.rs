//! Backend kinds and construction.
//!
//! [`BackendKind`] names every backend the driver understands, including the
//! quotient-filter and trie variants that have no implementation yet. Each kind
//! resolves through [`backend()`] to an [`NgramBackend`], which validates a
//! configuration and constructs the filter set. The unimplemented kinds
//! resolve to a backend that rejects every configuration, so adding one later
//! only means replacing that entry.

#![allow(clippy::module_name_repetitions)]

use crate::core::alloc::{CounterAllocator, HeapAllocator};
use crate::core::counter::ConcurrencyMode;
use crate::core::params::{BloomSizing, ARRAY_MAX_NGRAM};
use crate::core::range::NgramRange;
use crate::error::{NgramError, Result};
use crate::filters::{ArrayFilterSet, BloomFilterSet};
use crate::ngram::NgramFilterSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The counting backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BackendKind {
    /// Direct-indexed counter arrays, lengths 1 to 4.
    Array,
    /// Counting Bloom filters.
    #[default]
    Bloom,
    /// Quotient filters (not implemented).
    Quotient,
    /// Tries (not implemented).
    Trie,
}

impl BackendKind {
    /// Every kind, in label-code order.
    pub const ALL: [Self; 4] = [Self::Array, Self::Bloom, Self::Quotient, Self::Trie];

    /// Numeric code stored in a [`FilterLabel`](crate::ngram::FilterLabel).
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Array => 1,
            Self::Bloom => 2,
            Self::Quotient => 3,
            Self::Trie => 4,
        }
    }

    /// Kind for a label code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Array),
            2 => Some(Self::Bloom),
            3 => Some(Self::Quotient),
            4 => Some(Self::Trie),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Bloom => "bloom",
            Self::Quotient => "quotient",
            Self::Trie => "trie",
        }
    }

    /// Whether the kind can be constructed.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        matches!(self, Self::Array | Self::Bloom)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = NgramError;

    /// Case-insensitive; anything starting with a kind's name selects it, so
    /// `"Bloom"` and `"bloomfilter"` both mean [`BackendKind::Bloom`].
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lowered.starts_with(kind.name()))
            .ok_or_else(|| NgramError::unknown_backend(s))
    }
}

/// Everything a backend needs besides the length range.
#[derive(Clone)]
pub struct BackendOptions {
    /// Bloom table sizing; ignored by the array backend.
    pub sizing: BloomSizing,
    /// Counter update mode.
    pub mode: ConcurrencyMode,
    /// Source of counter storage.
    pub allocator: Arc<dyn CounterAllocator>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            sizing: BloomSizing::default(),
            mode: ConcurrencyMode::default(),
            allocator: Arc::new(HeapAllocator),
        }
    }
}

impl fmt::Debug for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendOptions")
            .field("sizing", &self.sizing)
            .field("mode", &self.mode)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

/// Constructor for one kind of filter set.
pub trait NgramBackend: Send + Sync {
    /// The kind this backend builds.
    fn kind(&self) -> BackendKind;

    /// Reject configurations the backend cannot build.
    ///
    /// # Errors
    ///
    /// A configuration error describing the first problem found.
    fn validate(&self, range: NgramRange, options: &BackendOptions) -> Result<()>;

    /// Allocate a filter set. Validates first.
    ///
    /// # Errors
    ///
    /// Configuration errors, or an allocation error if a table could not be
    /// obtained. Tables allocated before the failure are released.
    fn create(&self, range: NgramRange, options: &BackendOptions) -> Result<Box<dyn NgramFilterSet>>;
}

/// Builds [`ArrayFilterSet`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayBackend;

impl NgramBackend for ArrayBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Array
    }

    fn validate(&self, range: NgramRange, _options: &BackendOptions) -> Result<()> {
        if range.max() > ARRAY_MAX_NGRAM {
            return Err(NgramError::unsupported_length(
                "array",
                range.max(),
                ARRAY_MAX_NGRAM,
            ));
        }
        Ok(())
    }

    fn create(&self, range: NgramRange, options: &BackendOptions) -> Result<Box<dyn NgramFilterSet>> {
        self.validate(range, options)?;
        Ok(Box::new(ArrayFilterSet::new(range, options)?))
    }
}

/// Builds [`BloomFilterSet`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct BloomBackend;

impl NgramBackend for BloomBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bloom
    }

    fn validate(&self, _range: NgramRange, options: &BackendOptions) -> Result<()> {
        options.sizing.validate()
    }

    fn create(&self, range: NgramRange, options: &BackendOptions) -> Result<Box<dyn NgramFilterSet>> {
        self.validate(range, options)?;
        Ok(Box::new(BloomFilterSet::new(range, options)?))
    }
}

/// Stands in for a named backend that has no implementation.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedBackend(BackendKind);

impl NgramBackend for UnimplementedBackend {
    fn kind(&self) -> BackendKind {
        self.0
    }

    fn validate(&self, _range: NgramRange, _options: &BackendOptions) -> Result<()> {
        Err(NgramError::unimplemented_backend(self.0.name()))
    }

    fn create(&self, range: NgramRange, options: &BackendOptions) -> Result<Box<dyn NgramFilterSet>> {
        self.validate(range, options)?;
        Err(NgramError::unimplemented_backend(self.0.name()))
    }
}

static ARRAY: ArrayBackend = ArrayBackend;
static BLOOM: BloomBackend = BloomBackend;
static QUOTIENT: UnimplementedBackend = UnimplementedBackend(BackendKind::Quotient);
static TRIE: UnimplementedBackend = UnimplementedBackend(BackendKind::Trie);

/// The backend for `kind`.
#[must_use]
pub fn backend(kind: BackendKind) -> &'static dyn NgramBackend {
    match kind {
        BackendKind::Array => &ARRAY,
        BackendKind::Bloom => &BLOOM,
        BackendKind::Quotient => &QUOTIENT,
        BackendKind::Trie => &TRIE,
    }
}
