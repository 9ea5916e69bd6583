//! Big-endian n-gram packing.
//!
//! The array backend uses the numeric value of an n-gram as its table index.
//! The convention is fixed: the first byte of the window is the most
//! significant, so
//!
//! ```text
//! index = Σ window[n-1-j] << (8j)      j = 0..n-1
//! ```
//!
//! and `"ab"` packs to `0x6162`. [`pack_ngram`] and [`unpack_ngram`] are
//! inverses for `n <= 8`. [`WindowPacker`] produces the same indices for every
//! window of a buffer by shifting one byte in at a time.

#![allow(clippy::cast_possible_truncation)]

use std::fmt::Write as _;

/// Largest n-gram that fits a packed `u64` index.
pub const MAX_PACKED_NGRAM: usize = 8;

/// Mask selecting the low `8·n` bits.
///
/// ```
/// use ngramcraft::util::bitops::ngram_mask;
///
/// assert_eq!(ngram_mask(1), 0xff);
/// assert_eq!(ngram_mask(3), 0xff_ffff);
/// assert_eq!(ngram_mask(8), u64::MAX);
/// ```
#[must_use]
#[inline]
pub const fn ngram_mask(n: usize) -> u64 {
    if n >= MAX_PACKED_NGRAM {
        u64::MAX
    } else {
        (1u64 << (8 * n)) - 1
    }
}

/// Pack the first `min(window.len(), 8)` bytes big-endian.
#[must_use]
#[inline]
pub fn pack_ngram(window: &[u8]) -> u64 {
    window
        .iter()
        .take(MAX_PACKED_NGRAM)
        .fold(0u64, |index, &byte| (index << 8) | u64::from(byte))
}

/// Recover the `n` bytes packed in `index`.
///
/// ```
/// use ngramcraft::util::bitops::{pack_ngram, unpack_ngram};
///
/// assert_eq!(pack_ngram(b"ab"), 0x6162);
/// assert_eq!(unpack_ngram(0x6162, 2), b"ab".to_vec());
/// ```
#[must_use]
pub fn unpack_ngram(index: u64, n: usize) -> Vec<u8> {
    let n = n.min(MAX_PACKED_NGRAM);
    (0..n).rev().map(|j| (index >> (8 * j)) as u8).collect()
}

/// Sliding big-endian packer over the windows of one buffer.
///
/// Yields the index of `buf[i..i + n]` for `i = 0..=buf.len() - n`, and nothing
/// when the buffer is shorter than `n`.
#[derive(Debug, Clone)]
pub struct WindowPacker<'a> {
    rest: std::slice::Iter<'a, u8>,
    work: u64,
    mask: u64,
    primed: bool,
    n: usize,
    buf: &'a [u8],
}

impl<'a> WindowPacker<'a> {
    /// Packer for the `n`-byte windows of `buf`. `n` must be in `1..=8`.
    #[must_use]
    pub fn new(buf: &'a [u8], n: usize) -> Self {
        debug_assert!((1..=MAX_PACKED_NGRAM).contains(&n));
        Self {
            rest: buf.iter(),
            work: 0,
            mask: ngram_mask(n),
            primed: false,
            n,
            buf,
        }
    }
}

impl Iterator for WindowPacker<'_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if !self.primed {
            self.primed = true;
            if self.buf.len() < self.n {
                return None;
            }
            for _ in 0..self.n {
                let &byte = self.rest.next()?;
                self.work = (self.work << 8) | u64::from(byte);
            }
            return Some(self.work & self.mask);
        }
        let &byte = self.rest.next()?;
        self.work = ((self.work << 8) | u64::from(byte)) & self.mask;
        Some(self.work)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.primed {
            self.rest.len()
        } else if self.buf.len() < self.n {
            0
        } else {
            self.buf.len() - self.n + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowPacker<'_> {}

/// True for bytes a terminal prints as themselves (`0x20..=0x7e`).
#[must_use]
#[inline]
pub const fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7e)
}

/// Render bytes for dumps: ` c` for printable bytes, ` (code)` otherwise.
///
/// ```
/// use ngramcraft::util::bitops::render_bytes;
///
/// assert_eq!(render_bytes(b"a\n"), " a (10)");
/// ```
#[must_use]
pub fn render_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        if is_printable(byte) {
            out.push(' ');
            out.push(byte as char);
        } else {
            let _ = write!(out, " ({byte})");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_big_endian() {
        assert_eq!(pack_ngram(b"a"), 0x61);
        assert_eq!(pack_ngram(b"abc"), 0x61_62_63);
        assert_eq!(pack_ngram(&[0x01, 0x00]), 0x0100);
        assert_eq!(pack_ngram(b""), 0);
    }

    #[test]
    fn test_pack_unpack_inverse() {
        for n in 1..=4 {
            let bytes: Vec<u8> = (0..n as u8).map(|b| b.wrapping_mul(37).wrapping_add(200)).collect();
            assert_eq!(unpack_ngram(pack_ngram(&bytes), n), bytes);
        }
    }

    #[test]
    fn test_window_packer_matches_pack() {
        let buf = b"abcdefg\x00\xff";
        for n in 1..=4 {
            let packed: Vec<u64> = WindowPacker::new(buf, n).collect();
            let expected: Vec<u64> = buf.windows(n).map(pack_ngram).collect();
            assert_eq!(packed, expected, "n={n}");
        }
    }

    #[test]
    fn test_window_packer_short_buffer() {
        assert_eq!(WindowPacker::new(b"ab", 3).count(), 0);
        assert_eq!(WindowPacker::new(b"", 1).count(), 0);
        assert_eq!(WindowPacker::new(b"abc", 3).collect::<Vec<_>>(), vec![0x61_62_63]);
    }

    #[test]
    fn test_window_packer_len() {
        let packer = WindowPacker::new(b"abcdef", 2);
        assert_eq!(packer.len(), 5);
        assert_eq!(WindowPacker::new(b"a", 2).len(), 0);
    }

    #[test]
    fn test_render_bytes() {
        assert_eq!(render_bytes(b"ab"), " a b");
        assert_eq!(render_bytes(&[0, 127, b' ']), " (0) (127)  ");
    }
}
