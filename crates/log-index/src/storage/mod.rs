//! Persistence layer: the key-value collaborator and the on-disk encoding.
//!
//! The index only needs an ordered byte-keyed store with durable `get`/`put`;
//! everything else (key layout, value encoding) lives here. Values are RLP
//! encoded, which is self-delimiting and yields byte-identical output for
//! identical ingestion streams.

use alloy_rlp::Decodable;

use crate::types::{FilterError, FilterResult};

pub mod keys;
mod mem;

pub use mem::MemoryKv;

/// Capability set the index requires from its persistent store.
///
/// Implementations are expected to be durable and internally synchronized;
/// the indexer serializes its own writes but reads concurrently from query
/// workers.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &[u8]) -> FilterResult<Option<Vec<u8>>>;

    /// Durably stores `value` under `key`, overwriting any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> FilterResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &[u8]) -> FilterResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> FilterResult<()> {
        (**self).put(key, value)
    }
}

/// Decodes an RLP value read back from the store.
pub(crate) fn decode_value<T: Decodable>(mut bytes: &[u8]) -> FilterResult<T> {
    T::decode(&mut bytes).map_err(|err| FilterError::CorruptedData(err.to_string()))
}

/// Decodes a big-endian `u64` sentinel or pointer value.
pub(crate) fn decode_u64_be(bytes: &[u8]) -> FilterResult<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| FilterError::CorruptedData(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Decodes a big-endian `u32` sentinel value.
pub(crate) fn decode_u32_be(bytes: &[u8]) -> FilterResult<u32> {
    let bytes: [u8; 4] = bytes
        .try_into()
        .map_err(|_| FilterError::CorruptedData(format!("expected 4 bytes, got {}", bytes.len())))?;
    Ok(u32::from_be_bytes(bytes))
}
