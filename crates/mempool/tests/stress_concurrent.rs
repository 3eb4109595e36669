//! Integration test: many threads hammering one pool.
//!
//! Each worker drives its own shadow model over a shared pool, so any
//! overlap between allocations handed to different threads, or any lost
//! update to the block chain, shows up as corrupted contents or a failed
//! invariant check once the workers join.

use std::sync::Arc;
use std::thread;

use mempool::prelude::*;
use mempool_test_utils::{random_ops, ShadowHeap};

const WORKERS: u64 = 8;

#[test]
fn independent_workloads_share_one_pool() {
    let pool = MemoryPool::with_capacity(256 * 1024).unwrap();

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let pool = &pool;
            s.spawn(move || {
                let mut shadow = ShadowHeap::new();
                for op in random_ops(0x5eed + worker, 3_000, 300) {
                    shadow
                        .apply(pool, &op)
                        .unwrap_or_else(|e| panic!("worker {worker}: {e}"));
                }
                shadow.verify(pool).unwrap();
                shadow.release_all(pool).unwrap();
            });
        }
    });

    pool.check_invariants().unwrap();
    assert_eq!(pool.live_allocations(), 0);
    assert_eq!(pool.blocks().len(), 1);
    let m = pool.metrics().unwrap();
    assert!(m.alloc_calls > 0);
    assert!(m.merges > 0);
}

#[test]
fn handles_can_be_freed_by_another_thread() {
    let pool = Arc::new(MemoryPool::with_capacity(64 * 1024).unwrap());
    let (tx, rx) = crossbeam_channel::bounded::<(Handle, u8)>(64);

    let producer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for i in 0..2_000u32 {
                let tag = (i % 251) as u8;
                let size = 8 + (i as usize % 13) * 8;
                // Back-pressure from the bounded channel keeps the pool from
                // filling up, but retry anyway if the consumer lags.
                let h = loop {
                    if let Some(h) = pool.alloc(size) {
                        break h;
                    }
                    thread::yield_now();
                };
                pool.write(h, 0, &vec![tag; size]).unwrap();
                tx.send((h, tag)).unwrap();
            }
        })
    };

    let consumer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let mut received = 0;
            for (h, tag) in rx {
                pool.with_payload(h, |bytes| {
                    assert!(bytes.iter().take(8).all(|&b| b == tag));
                })
                .unwrap();
                pool.free(h);
                received += 1;
            }
            received
        })
    };

    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), 2_000);
    pool.check_invariants().unwrap();
    assert_eq!(pool.live_allocations(), 0);
}

#[test]
fn racing_double_free_releases_once() {
    let pool = MemoryPool::with_capacity(4096).unwrap();
    for _ in 0..100 {
        let keep = pool.alloc(32).unwrap();
        let h = pool.alloc(64).unwrap();
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| pool.free(h));
            }
        });
        assert_eq!(pool.live_allocations(), 1);
        pool.check_invariants().unwrap();
        pool.free(keep);
    }
    let m = pool.metrics().unwrap();
    assert_eq!(m.ignored_frees, 300);
}

#[test]
fn list_per_thread_on_shared_pool() {
    let pool = MemoryPool::with_capacity(64 * 1024).unwrap();
    thread::scope(|s| {
        for t in 0..4u16 {
            let pool = &pool;
            s.spawn(move || {
                let mut list = LinkedList::new(pool);
                for v in 0..100 {
                    list.push_back(t * 1000 + v).unwrap();
                }
                for v in (0..100).step_by(2) {
                    assert!(list.remove(t * 1000 + v));
                }
                let expected: Vec<u16> = (0..100).skip(1).step_by(2).map(|v| t * 1000 + v).collect();
                assert_eq!(list.iter().collect::<Vec<_>>(), expected);
            });
        }
    });
    assert_eq!(pool.live_allocations(), 0);
    pool.check_invariants().unwrap();
}
