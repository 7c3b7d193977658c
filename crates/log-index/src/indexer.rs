//! The indexer owning the append cursor and the shared index state.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    cache::IndexCaches,
    config::LogIndexConfig,
    filter_map::{FilterMap, LogData},
    params::FilterMapParams,
    storage::{decode_u32_be, decode_u64_be, decode_value, keys, KeyValueStore},
    types::{FilterError, FilterResult, IndexedLog},
};

/// Mutable indexer state guarded by the reader-writer lock.
///
/// Ingestion holds the exclusive lock for a whole block; queries take the
/// shared lock only long enough to read range bounds or snapshot the
/// in-flight map.
#[derive(Debug)]
struct IndexerState {
    enabled: bool,
    latest_block: u64,
    next_map_index: u32,
    total_log_index: u64,
    /// Number of logs in the in-flight map.
    log_counter: u64,
    current_map: Option<FilterMap>,
    current_log_data: Option<LogData>,
}

/// A persistent, append-only filter-map index over event logs.
///
/// Ingestion appends per-block log batches via [`index_logs`]; queries
/// retrieve exact filtered results via
/// [`find_logs_by_range`](Self::find_logs_by_range). Maps are sealed and
/// persisted once they cover `values_per_map` log ordinals; the in-flight
/// map is additionally flushed after every block so that a restart loses
/// nothing.
///
/// [`index_logs`]: Self::index_logs
#[derive(Debug)]
pub struct LogIndexer<S> {
    store: S,
    params: FilterMapParams,
    config: LogIndexConfig,
    caches: IndexCaches,
    state: RwLock<IndexerState>,
}

impl<S: KeyValueStore> LogIndexer<S> {
    /// Opens an index over the given store, resuming from persisted state if
    /// any is present.
    ///
    /// The in-flight map is reloaded and its counters reconstructed from its
    /// log payload, so ingestion continues exactly where it stopped.
    pub fn open(store: S, config: LogIndexConfig) -> FilterResult<Self> {
        let params = config.params();

        let next_map_index = match store.get(&keys::NEXT_MAP_INDEX_KEY)? {
            Some(bytes) => decode_u32_be(&bytes)?,
            None => 0,
        };
        let latest_block = match store.get(&keys::LATEST_BLOCK_KEY)? {
            Some(bytes) => decode_u64_be(&bytes)?,
            None => 0,
        };
        let current_map = store
            .get(&keys::filter_map_key(next_map_index))?
            .map(|bytes| decode_value::<FilterMap>(&bytes))
            .transpose()?;
        let current_log_data = store
            .get(&keys::log_data_key(next_map_index))?
            .map(|bytes| decode_value::<LogData>(&bytes))
            .transpose()?;

        let log_counter = current_log_data.as_ref().map_or(0, |data| data.logs.len() as u64);
        let total_log_index = ((next_map_index as u64) << params.log_values_per_map) + log_counter;

        if total_log_index > 0 || latest_block > 0 {
            info!(
                target: "log_index",
                next_map_index,
                latest_block,
                total_log_index,
                "resuming log index"
            );
        }

        Ok(Self {
            store,
            params,
            caches: IndexCaches::new(
                config.max_cached_filter_maps,
                config.max_cached_block_pointers,
            ),
            state: RwLock::new(IndexerState {
                enabled: config.enabled,
                latest_block,
                next_map_index,
                total_log_index,
                log_counter,
                current_map,
                current_log_data,
            }),
            config,
        })
    }

    /// The map geometry of this index.
    pub fn params(&self) -> &FilterMapParams {
        &self.params
    }

    /// The configuration this index was opened with.
    pub fn config(&self) -> &LogIndexConfig {
        &self.config
    }

    /// Enables or disables the indexer. While disabled, ingestion only
    /// records block pointers and queries return no results.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.write().enabled = enabled;
    }

    /// Returns true if the indexer is accepting log payloads.
    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// The latest block whose logs have been ingested.
    pub fn latest_block(&self) -> u64 {
        self.state.read().latest_block
    }

    /// The index of the in-flight map.
    pub fn next_map_index(&self) -> u32 {
        self.state.read().next_map_index
    }

    /// Total number of logs ingested so far, which is also the next log
    /// ordinal to be assigned.
    pub fn total_log_index(&self) -> u64 {
        self.state.read().total_log_index
    }

    /// Number of logs placed into the in-flight map.
    pub fn logs_in_current_map(&self) -> u64 {
        self.state.read().log_counter
    }

    /// Ingests the logs of one block.
    ///
    /// Serialized with other ingestion calls; assigns consecutive log
    /// ordinals in call order. Has no error channel: persistence failures
    /// are retried once and then logged, and the block pointer is written on
    /// every path (empty block, disabled indexer, failed payload write) so
    /// the pointer sequence stays gapless.
    pub fn index_logs(&self, block_number: u64, logs: Vec<IndexedLog>) {
        let mut state = self.state.write();
        let block_first_index = state.total_log_index;

        if state.enabled && !logs.is_empty() {
            if let Err(err) = self.append_block(&mut state, block_number, logs) {
                error!(target: "log_index", %err, block_number, "failed to index block logs");
            }
        }

        self.store_block_lv_pointer(block_number, block_first_index);
    }

    fn append_block(
        &self,
        state: &mut IndexerState,
        block_number: u64,
        logs: Vec<IndexedLog>,
    ) -> FilterResult<()> {
        let log_count = logs.len();

        for log in logs {
            if state.log_counter == self.params.values_per_map() {
                self.seal_current_map(state, block_number)?;
            }

            let next_map_index = state.next_map_index;
            let lv_index =
                ((next_map_index as u64) << self.params.log_values_per_map) + state.log_counter;

            let map = state.current_map.get_or_insert_with(|| FilterMap::new(&self.params));
            map.add_log(&self.params, next_map_index, lv_index, &log.address, &log.topics)?;

            let data = state
                .current_log_data
                .get_or_insert_with(|| LogData::new(next_map_index, block_number));
            data.logs.push(log);
            data.end_block = block_number;

            state.log_counter += 1;
            state.total_log_index += 1;
        }

        state.latest_block = block_number;
        debug!(
            target: "log_index",
            block_number,
            log_count,
            total_log_index = state.total_log_index,
            "indexed block logs"
        );

        self.flush_current(state)
    }

    /// Persists the full in-flight map, moves it into the LRU caches and
    /// advances the append cursor to a fresh map.
    fn seal_current_map(&self, state: &mut IndexerState, block_number: u64) -> FilterResult<()> {
        let (Some(map), Some(data)) = (state.current_map.take(), state.current_log_data.take())
        else {
            return Ok(());
        };

        let map_index = state.next_map_index;
        self.persist_map(map_index, &map, &data)?;
        self.caches.insert_filter_map(map_index, Arc::new(map));
        self.caches.insert_log_data(map_index, Arc::new(data));

        state.next_map_index += 1;
        state.log_counter = 0;
        state.current_map = Some(FilterMap::new(&self.params));
        state.current_log_data = Some(LogData::new(state.next_map_index, block_number));

        info!(target: "log_index", map_index, "sealed filter map");
        Ok(())
    }

    /// Per-block durability: rewrites the in-flight map and payload and the
    /// recovery sentinels.
    fn flush_current(&self, state: &IndexerState) -> FilterResult<()> {
        if let (Some(map), Some(data)) = (&state.current_map, &state.current_log_data) {
            self.persist_map(state.next_map_index, map, data)?;
        }
        self.put_with_retry(&keys::LATEST_BLOCK_KEY, &state.latest_block.to_be_bytes())?;
        self.put_with_retry(&keys::NEXT_MAP_INDEX_KEY, &state.next_map_index.to_be_bytes())
    }

    fn persist_map(&self, map_index: u32, map: &FilterMap, data: &LogData) -> FilterResult<()> {
        self.put_with_retry(&keys::filter_map_key(map_index), &alloy_rlp::encode(map))?;
        self.put_with_retry(&keys::log_data_key(map_index), &alloy_rlp::encode(data))
    }

    fn put_with_retry(&self, key: &[u8], value: &[u8]) -> FilterResult<()> {
        if let Err(err) = self.store.put(key, value) {
            warn!(target: "log_index", %err, "key-value write failed, retrying once");
            return self.store.put(key, value);
        }
        Ok(())
    }

    fn store_block_lv_pointer(&self, block: u64, lv_index: u64) {
        self.caches.insert_lv_pointer(block, lv_index);
        if let Err(err) =
            self.put_with_retry(&keys::block_lv_pointer_key(block), &lv_index.to_be_bytes())
        {
            error!(target: "log_index", %err, block, "failed to persist block pointer");
        }
    }

    /// The log ordinal at which the given block's logs begin, or at which
    /// the next log would have been appended for a block without logs.
    pub fn block_lv_pointer(&self, block: u64) -> FilterResult<u64> {
        if let Some(lv_index) = self.caches.lv_pointer(block) {
            return Ok(lv_index);
        }

        let Some(bytes) = self.store.get(&keys::block_lv_pointer_key(block))? else {
            return Err(FilterError::UnindexedBlock(block));
        };
        let lv_index = decode_u64_be(&bytes)?;
        self.caches.insert_lv_pointer(block, lv_index);
        Ok(lv_index)
    }

    /// Resolves a block range to the covered log ordinal range.
    ///
    /// `last_block` is clamped to the latest ingested block first. The end
    /// of range for the head is `total_log_index - 1` exactly; a pointer
    /// miss elsewhere falls back to the legacy `block * 10` estimate bounded
    /// by `total_log_index`.
    ///
    /// Returns `(first_index, last_index, clamped_last_block)`.
    pub(crate) fn log_index_range(
        &self,
        first_block: u64,
        last_block: u64,
    ) -> FilterResult<(u64, u64, u64)> {
        let (latest_block, total_log_index) = {
            let state = self.state.read();
            (state.latest_block, state.total_log_index)
        };
        let last_block = last_block.min(latest_block);

        let first_index = match self.block_lv_pointer(first_block) {
            Ok(lv_index) => lv_index,
            Err(FilterError::UnindexedBlock(_)) => {
                first_block.saturating_mul(10).min(total_log_index)
            }
            Err(err) => return Err(err),
        };

        let next_index = if last_block >= latest_block {
            total_log_index
        } else {
            match self.block_lv_pointer(last_block + 1) {
                Ok(lv_index) => lv_index,
                Err(FilterError::UnindexedBlock(_)) => {
                    (last_block + 1).saturating_mul(10).min(total_log_index)
                }
                Err(err) => return Err(err),
            }
        };

        Ok((first_index, next_index.saturating_sub(1), last_block))
    }

    /// Loads a filter map: the in-flight map is snapshotted from the locked
    /// state, sealed maps come from the LRU cache or the store.
    pub(crate) fn filter_map(&self, map_index: u32) -> FilterResult<Option<Arc<FilterMap>>> {
        {
            let state = self.state.read();
            if map_index == state.next_map_index {
                return Ok(state.current_map.as_ref().map(|map| Arc::new(map.clone())));
            }
        }

        if let Some(map) = self.caches.filter_map(map_index) {
            return Ok(Some(map));
        }

        let Some(bytes) = self.store.get(&keys::filter_map_key(map_index))? else {
            return Ok(None);
        };
        let map = Arc::new(decode_value::<FilterMap>(&bytes)?);
        self.caches.insert_filter_map(map_index, map.clone());
        Ok(Some(map))
    }

    /// Loads the log payload of a map, mirroring [`filter_map`](Self::filter_map).
    pub(crate) fn log_data(&self, map_index: u32) -> FilterResult<Option<Arc<LogData>>> {
        {
            let state = self.state.read();
            if map_index == state.next_map_index {
                return Ok(state.current_log_data.as_ref().map(|data| Arc::new(data.clone())));
            }
        }

        if let Some(data) = self.caches.log_data(map_index) {
            return Ok(Some(data));
        }

        let Some(bytes) = self.store.get(&keys::log_data_key(map_index))? else {
            return Ok(None);
        };
        let data = Arc::new(decode_value::<LogData>(&bytes)?);
        self.caches.insert_log_data(map_index, data.clone());
        Ok(Some(data))
    }
}
