//! Shared payload generators and constants for the benchmarks
//!
//! Payloads are seeded so that runs are comparable across machines.
#![allow(dead_code)]

use ngramcraft::core::{BloomSizing, ConcurrencyMode};
use ngramcraft::{BackendKind, NgramConfig, NgramFilterSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Payload sizes in bytes: a small packet, a full Ethernet frame, a jumbo frame
pub const PAYLOAD_SIZES: &[usize] = &[64, 1500, 9000];

/// Length ranges to sweep for the Bloom backend
pub const BLOOM_RANGES: &[(usize, usize)] = &[(3, 3), (3, 8), (1, 25)];

/// Counters per Bloom filter; keeps setup cheap compared to standard sizing
pub const BLOOM_COUNTERS: usize = 1 << 20;

/// Probes per Bloom filter
pub const BLOOM_PROBES: usize = 7;

/// Uniformly random bytes
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Printable ASCII resembling request lines and headers
pub fn text_payload(len: usize, seed: u64) -> Vec<u8> {
    const LINES: &[&[u8]] = &[
        b"GET /index.html HTTP/1.1\r\n",
        b"Host: example.org\r\n",
        b"User-Agent: curl/8.4.0\r\n",
        b"Accept: */*\r\n",
        b"Cookie: session=",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 32);
    while out.len() < len {
        out.extend_from_slice(LINES[rng.gen_range(0..LINES.len())]);
    }
    out.truncate(len);
    out
}

/// A set with explicit Bloom sizing
pub fn create_set(
    kind: BackendKind,
    min: usize,
    max: usize,
    mode: ConcurrencyMode,
) -> Box<dyn NgramFilterSet> {
    NgramConfig::builder()
        .backend(kind)
        .lengths(min, max)
        .sizing(BloomSizing::Explicit {
            counters: BLOOM_COUNTERS,
            probes: BLOOM_PROBES,
        })
        .mode(mode)
        .build()
        .expect("benchmark configuration is valid")
        .create()
        .expect("benchmark set allocates")
}
