//! Helpers for constructing deterministic test data.

use alloy_primitives::{Address, Bytes, B256};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::types::IndexedLog;

/// A deterministic generator for reproducible tests.
pub fn rng_with_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A random emitting address.
pub fn random_address(rng: &mut StdRng) -> Address {
    Address::from(rng.random::<[u8; 20]>())
}

/// A random topic value.
pub fn random_topic(rng: &mut StdRng) -> B256 {
    B256::from(rng.random::<[u8; 32]>())
}

/// A log with the given filterable fields and empty payload.
pub fn log_with(address: Address, topics: &[B256], block_number: u64) -> IndexedLog {
    IndexedLog::new(address, topics.to_vec(), block_number)
}

/// A log with a random address, one to three random topics and a short
/// random payload.
pub fn random_log(rng: &mut StdRng, block_number: u64) -> IndexedLog {
    let topic_count = rng.random_range(1..=3);
    let topics = (0..topic_count).map(|_| random_topic(rng)).collect();
    let data: Vec<u8> = (0..rng.random_range(0..8)).map(|_| rng.random()).collect();

    IndexedLog {
        address: random_address(rng),
        topics,
        block_number,
        data: Bytes::from(data),
        ..Default::default()
    }
}

/// A log emitted by an address drawn from the given pool, with one random
/// topic.
pub fn random_log_from_pool(
    rng: &mut StdRng,
    addresses: &[Address],
    block_number: u64,
) -> IndexedLog {
    let address = addresses[rng.random_range(0..addresses.len())];
    IndexedLog::new(address, vec![random_topic(rng)], block_number)
}
