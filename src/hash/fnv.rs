//! 64-bit FNV-1 hashing, single length and incremental over a length range.
//!
//! FNV-1 processes one byte at a time (`h = (h × prime) ^ byte`), so the hash of
//! a prefix of length `i + 1` is one step away from the hash of the prefix of
//! length `i`. [`fnv1_64_range`] exploits that: a single pass over
//! `buf[..high]` yields the hash of every prefix length in `[low, high]`,
//! identical to calling [`fnv1_64`] on each truncation separately.
//!
//! ```
//! use ngramcraft::hash::fnv::{fnv1_64, fnv1_64_range, FNV1_64_INIT};
//!
//! let buf = b"abcdefghij";
//! let hashes = fnv1_64_range(buf, 3, 10, FNV1_64_INIT);
//! assert_eq!(hashes.len(), 8);
//! assert_eq!(hashes[0], fnv1_64(b"abc", FNV1_64_INIT));
//! assert_eq!(hashes[7], fnv1_64(buf, FNV1_64_INIT));
//! ```
//!
//! Passing a previous result as `basis` chains hashes across calls.

/// Offset basis for FNV-1 and FNV-1a.
pub const FNV1_64_INIT: u64 = 0xcbf2_9ce4_8422_2325;

/// Historic FNV-0 basis.
pub const FNV0_64_INIT: u64 = 0;

/// 64-bit FNV prime, `2^40 + 2^8 + 0xb3`.
pub const FNV_64_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline(always)]
fn step(hash: u64, byte: u8) -> u64 {
    hash.wrapping_mul(FNV_64_PRIME) ^ u64::from(byte)
}

/// FNV-1 hash of `buf`, starting from `basis`.
#[must_use]
#[inline]
pub fn fnv1_64(buf: &[u8], basis: u64) -> u64 {
    buf.iter().fold(basis, |hash, &byte| step(hash, byte))
}

/// FNV-1 hash of a NUL-terminated string: stops at the first zero byte.
#[must_use]
#[inline]
pub fn fnv1_64_str(s: &[u8], basis: u64) -> u64 {
    s.iter()
        .take_while(|&&byte| byte != 0)
        .fold(basis, |hash, &byte| step(hash, byte))
}

/// Hash of every prefix of `buf` with length in `[low, high]`.
///
/// `high` is clamped to `buf.len()`. Entry `i` of the result is the hash of
/// `buf[..low + i]`; when `low == 0` the first entry is `basis`. When `low`
/// exceeds the clamped `high` no prefix qualifies and the result is `[basis]`.
#[must_use]
pub fn fnv1_64_range(buf: &[u8], low: usize, high: usize, basis: u64) -> Vec<u64> {
    let mut out = Vec::new();
    fnv1_64_range_into(buf, low, high, basis, &mut out);
    out
}

/// [`fnv1_64_range`] writing into a reusable buffer, which is cleared first.
///
/// Returns the number of hashes written.
pub fn fnv1_64_range_into(
    buf: &[u8],
    low: usize,
    high: usize,
    basis: u64,
    out: &mut Vec<u64>,
) -> usize {
    out.clear();
    let high = high.min(buf.len());
    if low > high {
        out.push(basis);
        return 1;
    }
    out.reserve(high - low + 1);

    if low == 0 {
        out.push(basis);
    }
    let mut hash = basis;
    for (i, &byte) in buf[..high].iter().enumerate() {
        hash = step(hash, byte);
        if i + 1 >= low {
            out.push(hash);
        }
    }
    out.len()
}

/// Range hash of a NUL-terminated string.
///
/// Stops at the terminator or at `high`, whichever comes first, so the result
/// may be shorter than `high - low + 1`. An empty string still yields `basis`
/// as its only entry.
#[must_use]
pub fn fnv1_64_str_range(s: &[u8], low: usize, high: usize, basis: u64) -> Vec<u64> {
    let len = s.iter().position(|&byte| byte == 0).unwrap_or(s.len());
    if len == 0 {
        return vec![basis];
    }
    fnv1_64_range(&s[..len], low, high, basis)
}
