//! Range queries: candidate extraction over filter maps, parallel epoch
//! processing and exact verification.

use alloy_primitives::{Address, B256};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::{
    collections::{BTreeMap, BTreeSet},
    thread,
};
use tracing::debug;

use crate::{
    cancel::CancelToken,
    constants::MAX_LAYERS,
    filter_map::{FilterMap, FilterRow},
    params::{address_value, topic_value, FilterMapParams},
    storage::KeyValueStore,
    types::{FilterError, FilterResult, IndexedLog, LogFilter},
};

impl<S: KeyValueStore> crate::LogIndexer<S> {
    /// Finds all logs in `[first_block, last_block]` matching the filter.
    ///
    /// `addresses` is a list of alternatives with empty meaning any address;
    /// `topics[i]` constrains topic position `i` the same way, with an empty
    /// list as a wildcard. Results are exact (candidates are verified
    /// against the stored records) and ordered by log ordinal.
    ///
    /// Epochs of maps are processed on a worker pool; `cancel` aborts the
    /// query between per-map work items with [`FilterError::Cancelled`].
    pub fn find_logs_by_range(
        &self,
        cancel: &CancelToken,
        first_block: u64,
        last_block: u64,
        addresses: Vec<Address>,
        topics: Vec<Vec<B256>>,
    ) -> FilterResult<Vec<IndexedLog>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }

        let (first_index, last_index, last_block) = self.log_index_range(first_block, last_block)?;
        if first_index > last_index {
            return Ok(Vec::new());
        }

        let params = self.params();
        let matcher = FilterMapMatcher {
            indexer: self,
            params,
            address_values: addresses.iter().map(address_value).collect(),
            topic_values: topics
                .iter()
                .map(|alternatives| alternatives.iter().map(topic_value).collect())
                .collect(),
            filter: LogFilter::new(addresses, topics),
            first_block,
            last_block,
            first_map: params.map_index_of(first_index),
            last_map: params.map_index_of(last_index),
        };

        matcher.run(cancel, self.config().query_worker_count.max(1))
    }

    /// Convenience entry accepting optional bounds: `from_block` defaults to
    /// genesis, `to_block` to the latest ingested block.
    pub fn get_logs(
        &self,
        cancel: &CancelToken,
        from_block: Option<u64>,
        to_block: Option<u64>,
        addresses: Vec<Address>,
        topics: Vec<Vec<B256>>,
    ) -> FilterResult<Vec<IndexedLog>> {
        let from = from_block.unwrap_or_default();
        let to = to_block.unwrap_or_else(|| self.latest_block());
        self.find_logs_by_range(cancel, from, to, addresses, topics)
    }
}

/// One query over a resolved map range.
struct FilterMapMatcher<'a, S> {
    indexer: &'a crate::LogIndexer<S>,
    params: &'a FilterMapParams,
    filter: LogFilter,
    /// Hashed filter values, computed once per query.
    address_values: Vec<B256>,
    topic_values: Vec<Vec<B256>>,
    first_block: u64,
    last_block: u64,
    first_map: u32,
    last_map: u32,
}

/// A unit of work handed to the pool: one epoch of maps.
struct EpochTask {
    epoch: u32,
    results: Sender<FilterResult<Vec<IndexedLog>>>,
}

impl<S: KeyValueStore> FilterMapMatcher<'_, S> {
    /// Processes all epochs covering the map range on `workers` threads.
    ///
    /// A coordinator dispatches epochs in ascending order, each exactly
    /// once, and collects results in the same order, so the output is
    /// identical for any worker count. All workers are joined before this
    /// returns, on error and cancellation paths included.
    fn run(&self, cancel: &CancelToken, workers: usize) -> FilterResult<Vec<IndexedLog>> {
        let first_epoch = self.first_map >> self.params.log_maps_per_epoch;
        let last_epoch = self.last_map >> self.params.log_maps_per_epoch;

        debug!(
            target: "log_index",
            first_map = self.first_map,
            last_map = self.last_map,
            first_epoch,
            last_epoch,
            workers,
            "processing log query"
        );

        thread::scope(|scope| {
            let (task_tx, task_rx) = bounded::<EpochTask>(0);

            for _ in 0..workers {
                let task_rx = task_rx.clone();
                scope.spawn(move || {
                    for task in task_rx.iter() {
                        let outcome = self.process_epoch(task.epoch, cancel);
                        let _ = task.results.send(outcome);
                    }
                });
            }
            drop(task_rx);

            // Dropping the task sender on every exit path below shuts the
            // workers down; the scope then joins them.
            self.dispatch(task_tx, cancel, first_epoch, last_epoch)
        })
    }

    /// Feeds epoch tasks to the pool and stitches results back together in
    /// epoch order.
    fn dispatch(
        &self,
        task_tx: Sender<EpochTask>,
        cancel: &CancelToken,
        first_epoch: u32,
        last_epoch: u32,
    ) -> FilterResult<Vec<IndexedLog>> {
        type Slot = (Sender<FilterResult<Vec<IndexedLog>>>, Receiver<FilterResult<Vec<IndexedLog>>>);

        let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
        let mut next_epoch = first_epoch;
        let mut await_epoch = first_epoch;
        let mut logs = Vec::new();

        slots.insert(next_epoch, bounded(1));

        while await_epoch <= last_epoch {
            if cancel.is_cancelled() {
                return Err(FilterError::Cancelled);
            }

            let wait_rx = slots[&await_epoch].1.clone();

            if next_epoch <= last_epoch {
                let results = slots[&next_epoch].0.clone();
                let epoch = next_epoch;
                select! {
                    send(task_tx, EpochTask { epoch, results }) -> sent => {
                        if sent.is_err() {
                            return Err(FilterError::Internal("query workers exited".to_string()));
                        }
                        next_epoch += 1;
                        if next_epoch <= last_epoch {
                            slots.entry(next_epoch).or_insert_with(|| bounded(1));
                        }
                    }
                    recv(wait_rx) -> outcome => {
                        logs.extend(Self::epoch_outcome(outcome)?);
                        slots.remove(&await_epoch);
                        await_epoch += 1;
                    }
                    recv(cancel.signal()) -> _ => return Err(FilterError::Cancelled),
                }
            } else {
                select! {
                    recv(wait_rx) -> outcome => {
                        logs.extend(Self::epoch_outcome(outcome)?);
                        slots.remove(&await_epoch);
                        await_epoch += 1;
                    }
                    recv(cancel.signal()) -> _ => return Err(FilterError::Cancelled),
                }
            }
        }

        Ok(logs)
    }

    fn epoch_outcome(
        outcome: Result<FilterResult<Vec<IndexedLog>>, crossbeam_channel::RecvError>,
    ) -> FilterResult<Vec<IndexedLog>> {
        outcome.map_err(|_| FilterError::Internal("query worker disconnected".to_string()))?
    }

    /// Processes the maps of one epoch, clamped to the queried map range.
    fn process_epoch(&self, epoch: u32, cancel: &CancelToken) -> FilterResult<Vec<IndexedLog>> {
        let epoch_first = epoch << self.params.log_maps_per_epoch;
        let epoch_last = epoch_first + self.params.maps_per_epoch() - 1;

        let mut logs = Vec::new();
        for map_index in epoch_first.max(self.first_map)..=epoch_last.min(self.last_map) {
            // Cooperative: a worker is never interrupted mid-map.
            if cancel.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            logs.extend(self.process_map(map_index)?);
        }
        Ok(logs)
    }

    /// Produces the verified matches of a single map.
    fn process_map(&self, map_index: u32) -> FilterResult<Vec<IndexedLog>> {
        let Some(filter_map) = self.indexer.filter_map(map_index)? else {
            return Ok(Vec::new());
        };
        let Some(log_data) = self.indexer.log_data(map_index)? else {
            return Ok(Vec::new());
        };

        let map_first = (map_index as u64) << self.params.log_values_per_map;

        // Address constraint (or every ordinal present in the map), then one
        // intersection per constrained topic position.
        let mut candidates: BTreeSet<u64> = if self.address_values.is_empty() {
            (map_first..map_first + log_data.logs.len() as u64).collect()
        } else {
            let mut union = BTreeSet::new();
            for value in &self.address_values {
                let rows = self.rows_for_value(&filter_map, map_index, value)?;
                union.extend(self.params.potential_matches(&rows, map_index, value)?);
            }
            union
        };

        for alternatives in &self.topic_values {
            if alternatives.is_empty() {
                continue;
            }
            if candidates.is_empty() {
                break;
            }
            let mut kept = BTreeSet::new();
            for value in alternatives {
                let rows = self.rows_for_value(&filter_map, map_index, value)?;
                for candidate in self.params.potential_matches(&rows, map_index, value)? {
                    if candidates.contains(&candidate) {
                        kept.insert(candidate);
                    }
                }
            }
            candidates = kept;
        }

        let mut matches = Vec::new();
        for lv_index in candidates {
            let Some(log) = log_data.logs.get((lv_index - map_first) as usize) else {
                continue;
            };
            if log.block_number < self.first_block || log.block_number > self.last_block {
                continue;
            }
            if self.filter.matches(log) {
                matches.push(log.clone());
            }
        }
        Ok(matches)
    }

    /// Collects the per-layer rows a value may have been marked in, stopping
    /// at the first row with spare capacity: no higher layer can hold
    /// entries for the value once a shorter row was available.
    fn rows_for_value(
        &self,
        filter_map: &FilterMap,
        map_index: u32,
        value: &B256,
    ) -> FilterResult<Vec<FilterRow>> {
        let mut rows = Vec::new();
        for layer in 0..MAX_LAYERS {
            let row_index = self.params.row_index(map_index, layer, value) as usize;
            let row = filter_map.rows.get(row_index).cloned().unwrap_or_default();
            let full = row.len() as u32 >= self.params.max_row_length(layer);
            rows.push(row);
            if !full {
                return Ok(rows);
            }
        }
        Err(FilterError::MaxLayersExceeded(MAX_LAYERS))
    }
}
