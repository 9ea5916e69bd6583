//! Shared-mode filters fed from several threads

use ngramcraft::core::{BloomParams, BloomSizing, ConcurrencyMode, HeapAllocator};
use ngramcraft::filters::CountingBloomFilter;
use ngramcraft::{BackendKind, NgramConfig, NgramFilterSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;

fn shared_filter() -> Arc<CountingBloomFilter> {
    Arc::new(
        CountingBloomFilter::new(
            4,
            BloomParams {
                counters: 1 << 14,
                probes: 7,
            },
            Arc::new(HeapAllocator),
            ConcurrencyMode::Shared,
        )
        .unwrap(),
    )
}

fn shared_set(kind: BackendKind) -> Arc<dyn NgramFilterSet> {
    NgramConfig::builder()
        .backend(kind)
        .lengths(1, 3)
        .sizing(BloomSizing::Explicit {
            counters: 1 << 16,
            probes: 5,
        })
        .mode(ConcurrencyMode::Shared)
        .build()
        .unwrap()
        .create()
        .unwrap()
        .into()
}

#[test]
fn test_concurrent_adds_no_lost_updates() {
    let filter = shared_filter();
    let per_thread = 500;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let filter = Arc::clone(&filter);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    filter.add(b"GET ");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tally = filter.tally();
    assert_eq!(tally.total, (THREADS * per_thread) as u64);
    // The first-seen signal races; at least one thread saw the zero.
    assert!(tally.distinct >= 1);
    assert!(tally.distinct <= THREADS as u64);
    assert_eq!(u64::from(filter.find(b"GET ")), (THREADS * per_thread) as u64);
}

#[test]
fn test_concurrent_add_and_delete_balance() {
    let filter = shared_filter();
    for _ in 0..THREADS {
        filter.add(b"seed");
    }

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..200 {
                    filter.add(b"seed");
                    assert!(filter.delete(b"seed").is_removed());
                }
            });
        }
    });

    assert_eq!(filter.find(b"seed"), THREADS as u16);
    assert_eq!(filter.tally().total, THREADS as u64);
}

#[test]
fn test_concurrent_set_totals() {
    for kind in [BackendKind::Array, BackendKind::Bloom] {
        let set = shared_set(kind);
        let payloads: Vec<Vec<u8>> = (0..THREADS as u64)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..256).map(|_| rng.gen()).collect()
            })
            .collect();

        thread::scope(|scope| {
            for payload in &payloads {
                let set = Arc::clone(&set);
                scope.spawn(move || set.add_item(payload));
            }
        });

        let per_payload = 256 + 255 + 254;
        assert_eq!(
            set.totals().total,
            (THREADS * per_payload) as u64,
            "{kind}"
        );
        for payload in &payloads {
            assert!(set.find_ngram(&payload[..3]).unwrap() >= 1, "{kind}");
        }
    }
}
