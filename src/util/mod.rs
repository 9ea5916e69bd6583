//! Internal utility functions and helpers.
//!
//! # Modules
//!
//! - [`bitops`] - Big-endian n-gram packing and dump rendering

pub mod bitops;

pub use bitops::{ngram_mask, pack_ngram, render_bytes, unpack_ngram, WindowPacker};
