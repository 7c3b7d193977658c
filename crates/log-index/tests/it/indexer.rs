//! Ingestion and persistence behavior observed through queries.

use crate::{naive_filter, query, small_indexer};
use alloy_primitives::address;
use log_index::{
    storage::MemoryKv,
    test_utils::{random_log, random_log_from_pool, rng_with_seed},
    IndexedLog, TEST_PARAMS,
};
use rand::Rng;

// Enough logs to fill several maps and cross an epoch boundary; queries must
// see one seamless range.
#[test]
fn queries_span_map_and_epoch_boundaries() {
    let indexer = small_indexer(MemoryKv::new());
    let mut rng = rng_with_seed(0xb0b);
    let pool: Vec<_> = (1..=3u8)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[19] = i;
            alloy_primitives::Address::from(bytes)
        })
        .collect();

    // ~160 logs over 40 blocks: 10 maps of 16 ordinals, 2.5 epochs.
    let mut everything: Vec<IndexedLog> = Vec::new();
    for block in 1..=40u64 {
        let logs: Vec<_> =
            (0..4).map(|_| random_log_from_pool(&mut rng, &pool, block)).collect();
        everything.extend(logs.clone());
        indexer.index_logs(block, logs);
    }

    let maps_filled = everything.len() as u64 / TEST_PARAMS.values_per_map();
    assert!(maps_filled >= 8, "test must span multiple epochs, filled {maps_filled} maps");
    // The final full map is sealed lazily, so the cursor still points at it.
    assert_eq!(indexer.next_map_index() as u64, maps_filled - 1);

    for address in &pool {
        let found = query(&indexer, 1, 40, vec![*address], vec![]);
        let expected = naive_filter(&everything, 1, 40, &[*address], &[]);
        assert_eq!(found, expected);
    }
}

#[test]
fn restart_preserves_query_results() {
    let store = MemoryKv::new();
    let mut rng = rng_with_seed(0xdead);
    let addr = address!("0000000000000000000000000000000000000009");

    let before = {
        let indexer = small_indexer(store.clone());
        for block in 1..=20u64 {
            let mut logs: Vec<_> =
                (0..rng.random_range(0..3)).map(|_| random_log(&mut rng, block)).collect();
            if block % 5 == 0 {
                logs.push(IndexedLog::new(addr, vec![], block));
            }
            indexer.index_logs(block, logs);
        }
        query(&indexer, 1, 20, vec![addr], vec![])
    };
    assert_eq!(before.len(), 4);

    let reopened = small_indexer(store);
    assert_eq!(query(&reopened, 1, 20, vec![addr], vec![]), before);
    assert_eq!(query(&reopened, 1, 20, vec![], vec![]).len() as u64, reopened.total_log_index());
}

// Two indexers fed the same stream must write byte-identical stores.
#[test]
fn ingestion_is_deterministic() {
    let mut rng = rng_with_seed(0xcafe);
    let mut blocks: Vec<(u64, Vec<IndexedLog>)> = Vec::new();
    for block in 1..=25u64 {
        let logs = (0..rng.random_range(0..4)).map(|_| random_log(&mut rng, block)).collect();
        blocks.push((block, logs));
    }

    let store_a = MemoryKv::new();
    let store_b = MemoryKv::new();
    {
        let indexer = small_indexer(store_a.clone());
        for (block, logs) in &blocks {
            indexer.index_logs(*block, logs.clone());
        }
    }
    {
        let indexer = small_indexer(store_b.clone());
        for (block, logs) in &blocks {
            indexer.index_logs(*block, logs.clone());
        }
    }

    assert!(!store_a.is_empty());
    assert_eq!(store_a.entries(), store_b.entries());
}
