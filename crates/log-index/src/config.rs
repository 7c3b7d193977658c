//! Configuration for the log index.

use serde::{Deserialize, Serialize};

use crate::params::FilterMapParams;

/// Default number of cached filter maps and log payloads.
pub const DEFAULT_MAX_CACHED_FILTER_MAPS: u32 = 100;

/// Default number of cached block pointers.
pub const DEFAULT_MAX_CACHED_BLOCK_POINTERS: u32 = 1000;

/// Default number of query worker threads.
pub const DEFAULT_QUERY_WORKER_COUNT: usize = 4;

/// Settings for a [`LogIndexer`](crate::LogIndexer).
///
/// The six logarithmic parameters fix the persisted map geometry and must not
/// change once an index holds data; the remaining fields only tune runtime
/// behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogIndexConfig {
    /// Log2 of the number of rows per map. Default: 16.
    pub log_map_height: u32,
    /// Log2 of the column index bit width. Default: 24.
    pub log_map_width: u32,
    /// Log2 of the number of maps per epoch, the unit of parallel query
    /// dispatch. Default: 10.
    pub log_maps_per_epoch: u32,
    /// Log2 of the number of log ordinals per map. Default: 16.
    pub log_values_per_map: u32,
    /// Row length baseline as a multiple of the average fill. Default: 8.
    pub base_row_length_ratio: u32,
    /// Log2 growth of row capacity per overflow layer. Default: 4.
    pub log_layer_diff: u32,
    /// Capacity of the filter map and log payload caches. Default: 100.
    pub max_cached_filter_maps: u32,
    /// Capacity of the block pointer cache. Default: 1000.
    pub max_cached_block_pointers: u32,
    /// Number of worker threads processing query epochs. Default: 4.
    pub query_worker_count: usize,
    /// When false the indexer only records block pointers and queries return
    /// no results. Default: true.
    pub enabled: bool,
}

impl Default for LogIndexConfig {
    fn default() -> Self {
        let params = FilterMapParams::default();
        Self {
            log_map_height: params.log_map_height,
            log_map_width: params.log_map_width,
            log_maps_per_epoch: params.log_maps_per_epoch,
            log_values_per_map: params.log_values_per_map,
            base_row_length_ratio: params.base_row_length_ratio,
            log_layer_diff: params.log_layer_diff,
            max_cached_filter_maps: DEFAULT_MAX_CACHED_FILTER_MAPS,
            max_cached_block_pointers: DEFAULT_MAX_CACHED_BLOCK_POINTERS,
            query_worker_count: DEFAULT_QUERY_WORKER_COUNT,
            enabled: true,
        }
    }
}

impl LogIndexConfig {
    /// The map geometry derived from this configuration.
    pub const fn params(&self) -> FilterMapParams {
        FilterMapParams {
            log_map_height: self.log_map_height,
            log_map_width: self.log_map_width,
            log_maps_per_epoch: self.log_maps_per_epoch,
            log_values_per_map: self.log_values_per_map,
            base_row_length_ratio: self.base_row_length_ratio,
            log_layer_diff: self.log_layer_diff,
        }
    }

    /// Replaces the map geometry, keeping the runtime settings.
    pub const fn with_params(mut self, params: FilterMapParams) -> Self {
        self.log_map_height = params.log_map_height;
        self.log_map_width = params.log_map_width;
        self.log_maps_per_epoch = params.log_maps_per_epoch;
        self.log_values_per_map = params.log_values_per_map;
        self.base_row_length_ratio = params.base_row_length_ratio;
        self.log_layer_diff = params.log_layer_diff;
        self
    }

    /// Sets the number of query workers.
    pub const fn with_query_workers(mut self, workers: usize) -> Self {
        self.query_worker_count = workers;
        self
    }
}
