//! Bounded LRU caches over the persisted index structures.

use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use std::sync::Arc;

use crate::filter_map::{FilterMap, LogData};

/// LRU caches for sealed filter maps, their log payloads and block pointers.
///
/// Sealed maps are immutable, so cached entries never need invalidation; the
/// in-flight map is served from the indexer state and only enters the cache
/// once sealed. Each cache sits behind its own mutex so lookups on the query
/// path do not serialize against each other longer than a map lookup takes.
pub(crate) struct IndexCaches {
    filter_maps: Mutex<LruMap<u32, Arc<FilterMap>, ByLength>>,
    log_data: Mutex<LruMap<u32, Arc<LogData>, ByLength>>,
    lv_pointers: Mutex<LruMap<u64, u64, ByLength>>,
}

impl std::fmt::Debug for IndexCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCaches")
            .field("filter_maps", &self.filter_maps.lock().len())
            .field("log_data", &self.log_data.lock().len())
            .field("lv_pointers", &self.lv_pointers.lock().len())
            .finish()
    }
}

impl IndexCaches {
    pub(crate) fn new(max_filter_maps: u32, max_block_pointers: u32) -> Self {
        Self {
            filter_maps: Mutex::new(LruMap::new(ByLength::new(max_filter_maps.max(1)))),
            log_data: Mutex::new(LruMap::new(ByLength::new(max_filter_maps.max(1)))),
            lv_pointers: Mutex::new(LruMap::new(ByLength::new(max_block_pointers.max(1)))),
        }
    }

    pub(crate) fn filter_map(&self, map_index: u32) -> Option<Arc<FilterMap>> {
        self.filter_maps.lock().get(&map_index).map(|map| map.clone())
    }

    pub(crate) fn insert_filter_map(&self, map_index: u32, map: Arc<FilterMap>) {
        self.filter_maps.lock().insert(map_index, map);
    }

    pub(crate) fn log_data(&self, map_index: u32) -> Option<Arc<LogData>> {
        self.log_data.lock().get(&map_index).map(|data| data.clone())
    }

    pub(crate) fn insert_log_data(&self, map_index: u32, data: Arc<LogData>) {
        self.log_data.lock().insert(map_index, data);
    }

    pub(crate) fn lv_pointer(&self, block: u64) -> Option<u64> {
        self.lv_pointers.lock().get(&block).copied()
    }

    pub(crate) fn insert_lv_pointer(&self, block: u64, lv_index: u64) {
        self.lv_pointers.lock().insert(block, lv_index);
    }
}
