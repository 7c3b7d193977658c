//! End-to-end query behavior: the concrete scenarios plus the exactness and
//! wildcard properties.

use crate::{default_indexer, naive_filter, query, small_indexer};
use alloy_primitives::{address, b256};
use log_index::{
    storage::MemoryKv,
    test_utils::{log_with, random_log_from_pool, rng_with_seed},
    CancelToken, IndexedLog,
};
use rand::Rng;

#[test]
fn single_block_single_match() {
    let indexer = default_indexer(MemoryKv::new());
    let target = address!("00000000000000000000000000000000deadbeef");
    let other = address!("0000000000000000000000000000000000000001");
    let target_topic = b256!("00000000000000000000000000000000000000000000000000000000cafebabe");
    let other_topic = b256!("0000000000000000000000000000000000000000000000000000000000000001");

    indexer.index_logs(
        1,
        vec![log_with(target, &[target_topic], 1), log_with(other, &[other_topic], 1)],
    );

    let found = query(&indexer, 1, 1, vec![target], vec![]);
    assert_eq!(found, vec![log_with(target, &[target_topic], 1)]);
}

#[test]
fn topic_prefix_filter() {
    let indexer = default_indexer(MemoryKv::new());
    let target = address!("00000000000000000000000000000000deadbeef");
    let signature = b256!("00000000000000000000000000000000000000000000000000000000cafebabe");
    let second = b256!("0000000000000000000000000000000000000000000000000000000000000003");

    indexer.index_logs(1, vec![log_with(target, &[signature], 1)]);
    indexer.index_logs(2, vec![]);
    indexer.index_logs(3, vec![log_with(target, &[signature, second], 3)]);

    // Both logs carry the signature at position zero.
    let found = query(&indexer, 1, 3, vec![target], vec![vec![signature]]);
    assert_eq!(found.len(), 2);
    for log in &found {
        assert_eq!(log.address, target);
        assert_eq!(log.topics[0], signature);
    }

    // The second topic constrained at position zero matches nothing.
    assert!(query(&indexer, 1, 3, vec![], vec![vec![second]]).is_empty());

    // Constrained at position one it finds the block 3 log.
    let found = query(&indexer, 1, 3, vec![], vec![vec![], vec![second]]);
    assert_eq!(found, vec![log_with(target, &[signature, second], 3)]);
}

#[test]
fn empty_block_range_yields_nothing() {
    let indexer = default_indexer(MemoryKv::new());
    let addr = address!("0000000000000000000000000000000000000001");
    let topic = b256!("0000000000000000000000000000000000000000000000000000000000000001");

    indexer.index_logs(1, vec![log_with(addr, &[topic], 1)]);
    indexer.index_logs(2, vec![]);
    indexer.index_logs(3, vec![]);
    indexer.index_logs(4, vec![log_with(addr, &[topic], 4), log_with(addr, &[topic], 4)]);

    assert!(query(&indexer, 2, 3, vec![], vec![]).is_empty());

    // The surrounding blocks are unaffected.
    assert_eq!(query(&indexer, 1, 4, vec![], vec![]).len(), 3);
}

// Every ingested log must be retrievable by its address right away; the
// index may produce false positives internally but never false negatives.
#[test]
fn ingested_logs_are_always_found() {
    let indexer = small_indexer(MemoryKv::new());
    let mut rng = rng_with_seed(0xa11);
    let pool: Vec<_> = (1..=4u8)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[0] = 0x10;
            bytes[19] = i;
            alloy_primitives::Address::from(bytes)
        })
        .collect();

    for block in 1..=40u64 {
        let logs: Vec<_> = (0..rng.random_range(0..4))
            .map(|_| random_log_from_pool(&mut rng, &pool, block))
            .collect();
        indexer.index_logs(block, logs.clone());

        for log in &logs {
            let found = query(&indexer, block, block, vec![log.address], vec![]);
            assert!(found.contains(log), "freshly ingested log not found in block {block}");
        }
    }
}

// Against a finite address pool the index must return exactly the logs a
// linear scan would, for every address and a spread of ranges.
#[test]
fn address_queries_are_exact() {
    let indexer = small_indexer(MemoryKv::new());
    let mut rng = rng_with_seed(0x5eed);
    let pool: Vec<_> = (1..=4u8)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[19] = i;
            alloy_primitives::Address::from(bytes)
        })
        .collect();

    let mut everything: Vec<IndexedLog> = Vec::new();
    for block in 1..=50u64 {
        let logs: Vec<_> = (0..rng.random_range(0..5))
            .map(|_| random_log_from_pool(&mut rng, &pool, block))
            .collect();
        everything.extend(logs.clone());
        indexer.index_logs(block, logs);
    }

    for address in &pool {
        for (first, last) in [(1, 50), (10, 20), (25, 25), (40, 50)] {
            let found = query(&indexer, first, last, vec![*address], vec![]);
            let expected = naive_filter(&everything, first, last, &[*address], &[]);
            assert_eq!(found, expected, "mismatch for {address} over [{first}, {last}]");
        }
    }

    // Unfiltered query over everything.
    assert_eq!(query(&indexer, 1, 50, vec![], vec![]), everything);
}

// Appending non-empty topic constraints can only shrink the result set, and
// wildcard positions never constrain it.
#[test]
fn topic_constraints_are_monotone() {
    let indexer = small_indexer(MemoryKv::new());
    let addr = address!("0000000000000000000000000000000000000042");
    let sig_a = b256!("000000000000000000000000000000000000000000000000000000000000000a");
    let sig_b = b256!("000000000000000000000000000000000000000000000000000000000000000b");
    let arg = b256!("00000000000000000000000000000000000000000000000000000000000000cc");

    let mut rng = rng_with_seed(0x70c);
    for block in 1..=30u64 {
        let mut logs = Vec::new();
        for _ in 0..rng.random_range(1..4) {
            let sig = if rng.random_bool(0.5) { sig_a } else { sig_b };
            let topics =
                if rng.random_bool(0.3) { vec![sig, arg] } else { vec![sig] };
            logs.push(log_with(addr, &topics, block));
        }
        indexer.index_logs(block, logs);
    }

    let unconstrained = query(&indexer, 1, 30, vec![addr], vec![]);
    let wildcard_only = query(&indexer, 1, 30, vec![addr], vec![vec![]]);
    let by_sig = query(&indexer, 1, 30, vec![addr], vec![vec![sig_a]]);
    let by_sig_and_arg = query(&indexer, 1, 30, vec![addr], vec![vec![sig_a], vec![arg]]);
    let by_either_sig = query(&indexer, 1, 30, vec![addr], vec![vec![sig_a, sig_b]]);

    assert_eq!(unconstrained, wildcard_only);
    assert_eq!(by_either_sig, unconstrained);
    assert!(by_sig.len() <= unconstrained.len());
    assert!(by_sig_and_arg.len() <= by_sig.len());

    for log in &by_sig {
        assert_eq!(log.topics[0], sig_a);
    }
    for log in &by_sig_and_arg {
        assert_eq!(log.topics[0], sig_a);
        assert_eq!(log.topics[1], arg);
    }
    assert!(!by_sig_and_arg.is_empty(), "seeded stream should produce two-topic logs");
}

#[test]
fn open_ended_get_logs_uses_the_head() {
    let indexer = small_indexer(MemoryKv::new());
    let addr = address!("0000000000000000000000000000000000000007");
    let topic = b256!("0000000000000000000000000000000000000000000000000000000000000007");

    for block in 1..=5u64 {
        indexer.index_logs(block, vec![log_with(addr, &[topic], block)]);
    }

    let all = indexer.get_logs(&CancelToken::new(), None, None, vec![addr], vec![]).unwrap();
    assert_eq!(all.len(), 5);

    let tail = indexer.get_logs(&CancelToken::new(), Some(4), None, vec![addr], vec![]).unwrap();
    assert_eq!(tail.len(), 2);

    // A range beyond the head is clamped to it.
    let clamped = indexer.get_logs(&CancelToken::new(), Some(1), Some(100), vec![addr], vec![]).unwrap();
    assert_eq!(clamped.len(), 5);
}
