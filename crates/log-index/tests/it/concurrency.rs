//! Concurrent readers, worker-count equivalence and cancellation.

use crate::{query, small_indexer, small_indexer_with_workers};
use alloy_primitives::{address, b256};
use log_index::{
    storage::MemoryKv,
    test_utils::{log_with, random_log_from_pool, rng_with_seed},
    CancelToken, FilterError,
};
use std::{sync::Arc, thread};

// The coordinator awaits epochs in dispatch order, so the worker count must
// not be observable in the results.
#[test]
fn worker_count_does_not_change_results() {
    let store = MemoryKv::new();
    let mut rng = rng_with_seed(0x3057);
    let pool: Vec<_> = (1..=3u8)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[19] = i;
            alloy_primitives::Address::from(bytes)
        })
        .collect();

    {
        let indexer = small_indexer(store.clone());
        for block in 1..=60u64 {
            let logs: Vec<_> =
                (0..3).map(|_| random_log_from_pool(&mut rng, &pool, block)).collect();
            indexer.index_logs(block, logs);
        }
    }

    let serial = small_indexer_with_workers(store.clone(), 1);
    let parallel = small_indexer_with_workers(store, 8);

    for address in &pool {
        let a = query(&serial, 1, 60, vec![*address], vec![]);
        let b = query(&parallel, 1, 60, vec![*address], vec![]);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
    assert_eq!(query(&serial, 1, 60, vec![], vec![]), query(&parallel, 1, 60, vec![], vec![]));
}

// Ten readers resolving every block pointer while the structures they touch
// are shared with the ingestion lock.
#[test]
fn concurrent_pointer_readers() {
    let indexer = Arc::new(small_indexer(MemoryKv::new()));
    let addr = address!("0000000000000000000000000000000000000001");
    let topic = b256!("0000000000000000000000000000000000000000000000000000000000000001");

    for block in 1..=100u64 {
        indexer.index_logs(block, vec![log_with(addr, &[topic], block)]);
    }

    let mut handles = Vec::new();
    for _ in 0..10 {
        let indexer = indexer.clone();
        handles.push(thread::spawn(move || {
            for block in 1..=100u64 {
                assert_eq!(indexer.block_lv_pointer(block).unwrap(), block - 1);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn queries_run_alongside_ingestion() {
    let indexer = Arc::new(small_indexer(MemoryKv::new()));
    let addr = address!("0000000000000000000000000000000000000002");
    let topic = b256!("0000000000000000000000000000000000000000000000000000000000000002");

    indexer.index_logs(1, vec![log_with(addr, &[topic], 1)]);

    let writer = {
        let indexer = indexer.clone();
        thread::spawn(move || {
            for block in 2..=80u64 {
                indexer.index_logs(block, vec![log_with(addr, &[topic], block)]);
            }
        })
    };

    // Block 1 is fully ingested before the readers start, so it must be
    // visible in every snapshot the readers take.
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let indexer = indexer.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let found = query(&indexer, 1, 1, vec![addr], vec![]);
                    assert_eq!(found.len(), 1);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(query(&indexer, 1, 80, vec![addr], vec![]).len(), 80);
}

#[test]
fn cancelled_token_aborts_the_query() {
    let indexer = small_indexer(MemoryKv::new());
    let addr = address!("0000000000000000000000000000000000000003");
    let topic = b256!("0000000000000000000000000000000000000000000000000000000000000003");

    for block in 1..=10u64 {
        indexer.index_logs(block, vec![log_with(addr, &[topic], block)]);
    }

    let token = CancelToken::new();
    token.cancel();

    let result = indexer.find_logs_by_range(&token, 1, 10, vec![addr], vec![]);
    assert!(matches!(result, Err(FilterError::Cancelled)));

    // A fresh token still works.
    assert_eq!(query(&indexer, 1, 10, vec![addr], vec![]).len(), 10);
}
