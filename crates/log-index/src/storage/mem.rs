//! In-memory reference implementation of the key-value collaborator.

use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

use super::KeyValueStore;
use crate::types::FilterResult;

/// An ordered in-memory key-value store.
///
/// Clones share the underlying map, which lets tests "restart" an indexer by
/// reopening a clone of the store it wrote to.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// A snapshot of all entries, in key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &[u8]) -> FilterResult<Option<Vec<u8>>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> FilterResult<()> {
        self.inner.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
