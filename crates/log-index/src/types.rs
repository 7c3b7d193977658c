//! Core types shared across the log index.

use alloy_primitives::{Address, Bytes, B256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Errors surfaced by index operations.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Pointer lookup for a block that has not been ingested yet.
    #[error("block {0} is not indexed")]
    UnindexedBlock(u64),

    /// Key-value store read or write failure.
    #[error("key-value store error: {0}")]
    Database(String),

    /// The query observed its cancellation signal.
    #[error("query cancelled")]
    Cancelled,

    /// A search supplied rows for a map whose final layer was still full.
    #[error("insufficient filter map layers for map {0}")]
    InsufficientLayers(u32),

    /// The layer bound was exhausted while inserting or collecting rows.
    #[error("maximum layer limit ({0}) exceeded")]
    MaxLayersExceeded(u32),

    /// A persisted map or log payload failed to decode.
    #[error("corrupted filter map data: {0}")]
    CorruptedData(String),

    /// Invariant violation that should be unreachable in a healthy index.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for index operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// An event log record as stored in the index.
///
/// Carries everything needed to verify a candidate against a filter and to
/// hand the log back to the caller without consulting the block source.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct IndexedLog {
    /// The contract that emitted the log.
    pub address: Address,
    /// Positional topic values, at most four.
    pub topics: Vec<B256>,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the emitting transaction within its block.
    pub tx_index: u32,
    /// Position of the log within its block.
    pub log_index: u32,
    /// Opaque event payload.
    pub data: Bytes,
    /// True if the log was removed by a reorg on the source chain.
    pub removed: bool,
}

impl IndexedLog {
    /// Creates a log record with the fields relevant for filtering.
    pub fn new(address: Address, topics: Vec<B256>, block_number: u64) -> Self {
        Self { address, topics, block_number, ..Default::default() }
    }
}

/// Filter criteria for log matching.
///
/// Addresses are alternatives; each topic position holds alternatives as
/// well, with an empty position acting as a wildcard.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Addresses to match. Empty matches any address.
    pub addresses: Vec<Address>,
    /// Per-position topic alternatives. An empty list at a position matches
    /// any topic there.
    pub topics: Vec<Vec<B256>>,
}

impl LogFilter {
    /// Creates a new log filter.
    pub const fn new(addresses: Vec<Address>, topics: Vec<Vec<B256>>) -> Self {
        Self { addresses, topics }
    }

    /// Exact verification of a log against the filter, used to eliminate the
    /// false positives that row-based matching may produce.
    ///
    /// A constrained topic position that the log does not have rejects the
    /// log.
    pub fn matches(&self, log: &IndexedLog) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }

        for (i, alternatives) in self.topics.iter().enumerate() {
            if alternatives.is_empty() {
                continue;
            }
            match log.topics.get(i) {
                Some(topic) if alternatives.contains(topic) => {}
                _ => return false,
            }
        }

        true
    }
}
