//! Shared constants for the log index.

use crate::params::FilterMapParams;

/// Upper bound on mapping layers tried when inserting or searching a value.
///
/// With the default parameters a value repeated for every ordinal of a map is
/// fully absorbed after roughly a dozen layers, so hitting this bound means
/// the stored data is corrupt rather than merely dense.
pub const MAX_LAYERS: u32 = 32;

/// Capacity hint for candidate lists returned by row matching.
pub(crate) const EXPECTED_MATCHES: usize = 8;

/// Production parameters: one map holds `2^16` log ordinals across `2^16`
/// rows with 24-bit column entries, grouped into epochs of `2^10` maps.
pub const DEFAULT_PARAMS: FilterMapParams = FilterMapParams {
    log_map_height: 16,
    log_map_width: 24,
    log_maps_per_epoch: 10,
    log_values_per_map: 16,
    base_row_length_ratio: 8,
    log_layer_diff: 4,
};

/// Shrunken parameters for exercising map and epoch boundaries in tests:
/// 16 ordinals per map, 16 rows, 4 maps per epoch.
pub const TEST_PARAMS: FilterMapParams = FilterMapParams {
    log_map_height: 4,
    log_map_width: 8,
    log_maps_per_epoch: 2,
    log_values_per_map: 4,
    base_row_length_ratio: 8,
    log_layer_diff: 2,
};
