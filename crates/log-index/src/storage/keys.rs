//! Key layout of the persisted index.
//!
//! All keys are a one-byte prefix followed by a big-endian integer body, so
//! entries of one kind are contiguous in an ordered store.

/// Prefix for serialized filter maps, keyed by map index.
pub const FILTER_MAP_PREFIX: u8 = 0x10;

/// Prefix for serialized log payloads, keyed by map index.
pub const LOG_DATA_PREFIX: u8 = 0x11;

/// Reserved for raw log bodies.
pub const RAW_LOGS_PREFIX: u8 = 0x12;

/// Sentinel holding the latest ingested block number as `be64`.
pub const LATEST_BLOCK_KEY: [u8; 1] = [0x13];

/// Sentinel holding the in-flight map index as `be32`.
pub const NEXT_MAP_INDEX_KEY: [u8; 1] = [0x14];

/// Prefix for block to log-value pointers, keyed by block number, value
/// `be64(lv_index)`.
pub const BLOCK_LV_POINTER_PREFIX: u8 = 0x15;

/// Key of the serialized filter map with the given index.
pub fn filter_map_key(map_index: u32) -> [u8; 9] {
    prefixed(FILTER_MAP_PREFIX, map_index as u64)
}

/// Key of the serialized log payload of the given map.
pub fn log_data_key(map_index: u32) -> [u8; 9] {
    prefixed(LOG_DATA_PREFIX, map_index as u64)
}

/// Key of the log-value pointer of the given block.
pub fn block_lv_pointer_key(block: u64) -> [u8; 9] {
    prefixed(BLOCK_LV_POINTER_PREFIX, block)
}

fn prefixed(prefix: u8, body: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = prefix;
    key[1..].copy_from_slice(&body.to_be_bytes());
    key
}
