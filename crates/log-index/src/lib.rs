//! Persistent filter-map index for event logs.
//!
//! This crate indexes the event logs of a block stream so that queries over
//! a block range, filtered by emitting address and/or a positional topic
//! prefix, can be answered without scanning every block.
//!
//! ## Overview
//!
//! Logs are assigned consecutive ordinals as they are ingested. Each group
//! of `values_per_map` ordinals is summarized in a fixed-geometry *filter
//! map*: every value derived from a log (the SHA-256 of its address and of
//! each topic) is marked at a hash-derived row and column, with row
//! overflow absorbed by higher mapping layers spanning wider map ranges.
//! Row-based matching over these maps yields candidate ordinals with false
//! positives but no false negatives; candidates are then verified against
//! the stored log records, so query results are exact.
//!
//! The index provides:
//!
//! - Append-only ingestion of per-block log batches with per-block
//!   durability
//! - Conjunctive filter queries (address alternatives, topic-prefix
//!   alternatives, wildcards) over block ranges
//! - Parallel query processing over epochs of maps with cooperative
//!   cancellation
//! - Bounded LRU caching over the persisted maps, payloads and pointers
//!
//! ## Usage
//!
//! ```rust
//! use log_index::{storage::MemoryKv, CancelToken, IndexedLog, LogIndexConfig, LogIndexer};
//! use alloy_primitives::{address, b256};
//!
//! let indexer = LogIndexer::open(MemoryKv::new(), LogIndexConfig::default())?;
//!
//! let emitter = address!("00000000000000000000000000000000deadbeef");
//! let transfer = b256!("00000000000000000000000000000000000000000000000000000000cafebabe");
//! indexer.index_logs(1, vec![IndexedLog::new(emitter, vec![transfer], 1)]);
//!
//! let logs =
//!     indexer.find_logs_by_range(&CancelToken::new(), 1, 1, vec![emitter], vec![vec![transfer]])?;
//! assert_eq!(logs.len(), 1);
//! # Ok::<(), log_index::FilterError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cache;
mod cancel;
mod config;
mod constants;
mod filter_map;
mod indexer;
mod matcher;
mod params;
pub mod storage;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cancel::CancelToken;
pub use config::{
    LogIndexConfig, DEFAULT_MAX_CACHED_BLOCK_POINTERS, DEFAULT_MAX_CACHED_FILTER_MAPS,
    DEFAULT_QUERY_WORKER_COUNT,
};
pub use constants::{DEFAULT_PARAMS, MAX_LAYERS, TEST_PARAMS};
pub use filter_map::{FilterMap, FilterRow, LogData};
pub use indexer::LogIndexer;
pub use params::{address_value, topic_value, FilterMapParams};
pub use types::{FilterError, FilterResult, IndexedLog, LogFilter};
