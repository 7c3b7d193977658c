//! In-memory filter map and the per-map log payload.

use alloy_primitives::{Address, B256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

use crate::{
    constants::MAX_LAYERS,
    params::{address_value, topic_value, FilterMapParams},
    types::{FilterError, FilterResult, IndexedLog},
};

/// A single row of a filter map: column indices in insertion order.
///
/// Entries are kept exactly in the order they were added and duplicates are
/// kept as well; neither affects searching, and preserving the order keeps
/// persisted maps deterministic.
pub type FilterRow = Vec<u32>;

/// One fixed-geometry filter map covering `values_per_map` consecutive log
/// ordinals.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct FilterMap {
    /// Rows indexed by row index; always `map_height` entries.
    pub rows: Vec<FilterRow>,
}

impl FilterMap {
    /// Creates an empty map with the geometry given by `params`.
    pub fn new(params: &FilterMapParams) -> Self {
        Self { rows: vec![FilterRow::new(); params.map_height() as usize] }
    }

    /// Returns true if no value has been marked on the map.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    /// Marks all values derived from a log at the given ordinal: one
    /// placement for the emitting address plus one per topic, all sharing
    /// `lv_index`.
    pub fn add_log(
        &mut self,
        params: &FilterMapParams,
        map_index: u32,
        lv_index: u64,
        address: &Address,
        topics: &[B256],
    ) -> FilterResult<()> {
        self.add_value(params, map_index, lv_index, &address_value(address))?;
        for topic in topics {
            self.add_value(params, map_index, lv_index, &topic_value(topic))?;
        }
        Ok(())
    }

    /// Marks a single value, walking mapping layers until one maps it to a
    /// row with spare capacity.
    ///
    /// The row length is compared against the cap of the layer being tried:
    /// a row full at layer `l` may still accept the value when a higher
    /// layer maps it there again.
    fn add_value(
        &mut self,
        params: &FilterMapParams,
        map_index: u32,
        lv_index: u64,
        log_value: &B256,
    ) -> FilterResult<()> {
        let column = params.column_index(lv_index, log_value);

        for layer in 0..MAX_LAYERS {
            let row_index = params.row_index(map_index, layer, log_value) as usize;
            let row = &mut self.rows[row_index];
            if (row.len() as u32) < params.max_row_length(layer) {
                row.push(column);
                return Ok(());
            }
        }

        Err(FilterError::MaxLayersExceeded(MAX_LAYERS))
    }
}

/// The ordered log records placed into one map, with block-range metadata.
///
/// `logs[i]` is the record ingested at `lv_index = (map_index <<
/// log_values_per_map) + i`, which is what lets a candidate ordinal be
/// resolved back to its log without any further lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct LogData {
    /// The map these logs belong to.
    pub map_index: u32,
    /// First block with a log in this map.
    pub start_block: u64,
    /// Last block with a log in this map.
    pub end_block: u64,
    /// Log records in ingestion order.
    pub logs: Vec<IndexedLog>,
}

impl LogData {
    /// Creates an empty payload for the given map, starting at `block`.
    pub const fn new(map_index: u32, block: u64) -> Self {
        Self { map_index, start_block: block, end_block: block, logs: Vec::new() }
    }
}
