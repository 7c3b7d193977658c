//! Map geometry and the row/column mapping algorithms.
//!
//! A filter map is a sparse two-dimensional structure: `2^log_map_height`
//! rows of `2^log_map_width` columns, covering `2^log_values_per_map`
//! consecutive log ordinals. Every indexed value (the SHA-256 of an emitting
//! address or of a topic) is marked at a row derived from the value and the
//! map index, and a column that encodes both the ordinal's position inside
//! the map and a value-dependent hash.

use alloy_primitives::{Address, B256};
use fnv::FnvHasher;
use sha2::{Digest, Sha256};
use std::hash::Hasher;

use crate::{
    constants::{EXPECTED_MATCHES, MAX_LAYERS},
    filter_map::FilterRow,
    types::{FilterError, FilterResult},
};

/// Compute the log value hash of an emitting address.
pub fn address_value(address: &Address) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(address.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Compute the log value hash of a log topic.
pub fn topic_value(topic: &B256) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Logarithmic parameters fixing the geometry of all filter maps in an index.
///
/// The parameters are part of the persisted format: changing them invalidates
/// previously written maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMapParams {
    /// Log2 of the number of rows per map.
    pub log_map_height: u32,
    /// Log2 of the column index range, i.e. the bit width of column entries.
    pub log_map_width: u32,
    /// Log2 of the number of maps per epoch.
    pub log_maps_per_epoch: u32,
    /// Log2 of the number of log ordinals per map.
    pub log_values_per_map: u32,
    /// Baseline row length as a multiple of the average row fill.
    pub base_row_length_ratio: u32,
    /// Log2 growth of the row length cap per mapping layer.
    pub log_layer_diff: u32,
}

impl Default for FilterMapParams {
    fn default() -> Self {
        crate::constants::DEFAULT_PARAMS
    }
}

impl FilterMapParams {
    /// Number of rows per map.
    pub const fn map_height(&self) -> u32 {
        1 << self.log_map_height
    }

    /// Number of maps per epoch.
    pub const fn maps_per_epoch(&self) -> u32 {
        1 << self.log_maps_per_epoch
    }

    /// Number of log ordinals covered by one map.
    pub const fn values_per_map(&self) -> u64 {
        1 << self.log_values_per_map
    }

    /// Row length cap at layer zero.
    pub const fn base_row_length(&self) -> u32 {
        ((self.values_per_map() * self.base_row_length_ratio as u64) / self.map_height() as u64)
            as u32
    }

    /// The map index a log value index belongs to.
    pub const fn map_index_of(&self, lv_index: u64) -> u32 {
        (lv_index >> self.log_values_per_map) as u32
    }

    /// The row in which `log_value` is marked on the given map and layer.
    ///
    /// Row assignments are re-shuffled with a different frequency on each
    /// layer: layer zero changes once per epoch, higher layers re-map more
    /// often until every map gets its own assignment.
    pub fn row_index(&self, map_index: u32, layer_index: u32, log_value: &B256) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(log_value.as_slice());

        let mut index_bytes = [0u8; 8];
        index_bytes[..4].copy_from_slice(&self.masked_map_index(map_index, layer_index).to_le_bytes());
        index_bytes[4..].copy_from_slice(&layer_index.to_le_bytes());
        hasher.update(index_bytes);

        let hash = hasher.finalize();
        u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]) % self.map_height()
    }

    /// The column where `log_value` at ordinal `lv_index` is marked.
    ///
    /// The high bits carry the ordinal's position inside its map so that a
    /// candidate position can be reconstructed from a stored entry; the low
    /// bits carry an FNV-1a hash of `(lv_index, log_value)` used to reject
    /// entries written for other values sharing the row.
    pub fn column_index(&self, lv_index: u64, log_value: &B256) -> u32 {
        let mut hasher = FnvHasher::default();
        hasher.write(&lv_index.to_le_bytes());
        hasher.write(log_value.as_slice());
        let hash = hasher.finish();

        let hash_bits = self.log_map_width - self.log_values_per_map;
        let position = (lv_index % self.values_per_map()) as u32;
        let mixed = (hash >> (64 - hash_bits)) as u32 ^ (hash as u32 >> (32 - hash_bits));

        (position << hash_bits) | mixed
    }

    /// The index used for row mapping on the given layer.
    ///
    /// Masks out the low map index bits so that `2^min(layer·diff, epoch)`
    /// adjacent maps share a row assignment; overflowed rows on higher layers
    /// therefore span wider map ranges.
    pub fn masked_map_index(&self, map_index: u32, layer_index: u32) -> u32 {
        let log_layer_diff = (layer_index * self.log_layer_diff).min(self.log_maps_per_epoch);
        map_index & (u32::MAX << (self.log_maps_per_epoch - log_layer_diff))
    }

    /// Maximum number of entries a row may hold when populated on the given
    /// layer.
    ///
    /// A row that is full on one layer may still be extended through a higher
    /// order layer. Values are always marked on the lowest layer with spare
    /// capacity, so a search must walk layers until the first row that is not
    /// full.
    pub fn max_row_length(&self, layer_index: u32) -> u32 {
        let log_layer_diff = (layer_index * self.log_layer_diff).min(self.log_maps_per_epoch);
        self.base_row_length() << log_layer_diff
    }

    /// Number of layers that can absorb a value repeated for every ordinal of
    /// a single map.
    pub fn required_layers(&self) -> u32 {
        let mut capacity = 0u64;
        let mut layer = 0u32;
        while capacity < self.values_per_map() && layer < MAX_LAYERS {
            capacity += self.max_row_length(layer) as u64;
            layer += 1;
        }
        layer
    }

    /// Log value indices in the given map's range that potentially match
    /// `log_value`, reconstructed from the supplied rows.
    ///
    /// `rows[i]` must be the row assigned to the value on layer `i`, in
    /// ascending layer order with only the final row below its length cap.
    /// The result is sorted and deduplicated; true matches survive the
    /// re-derivation check while entries written for other values are
    /// rejected unless they collide on the full column. If the last row is
    /// still at capacity the caller failed to supply every populated layer.
    pub fn potential_matches(
        &self,
        rows: &[FilterRow],
        map_index: u32,
        log_value: &B256,
    ) -> FilterResult<Vec<u64>> {
        let mut results = Vec::with_capacity(EXPECTED_MATCHES);
        let map_first = (map_index as u64) << self.log_values_per_map;

        for (layer_index, row) in rows.iter().enumerate() {
            let max_len = self.max_row_length(layer_index as u32) as usize;
            let row_len = row.len().min(max_len);

            for &column in &row[..row_len] {
                let candidate =
                    map_first + u64::from(column >> (self.log_map_width - self.log_values_per_map));
                if column == self.column_index(candidate, log_value) {
                    results.push(candidate);
                }
            }

            if row_len < max_len {
                break;
            }
            if layer_index == rows.len() - 1 {
                return Err(FilterError::InsufficientLayers(map_index));
            }
        }

        results.sort_unstable();
        results.dedup();
        Ok(results)
    }
}
