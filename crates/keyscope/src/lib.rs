//! Keyscope - keyspace inventory for Redis
//!
//! Streams every key of a store, measures its memory cost and folds the
//! results into a prefix tree whose fan-out is bounded, so that "how much
//! memory lives under `user:*`" can be answered for keyspaces far too large
//! to list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  KeySource  │     │   Scanner   │     │    Tree     │     │  Inventory  │
//! │ (SCAN keys) │────▶│ (N workers, │────▶│ (bounded    │────▶│   Index     │
//! │             │     │ MEMORY USE) │     │  prefixes)  │     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Segment**: one component of a key, split on configured separators
//! - **Node**: a key prefix with accumulated [`Metric`] totals
//! - **Aggregated node**: a summary child holding everything beyond `max_children`
//! - **KeySource**: the store, as seen by the scanner

pub mod cancel;
pub mod config;
pub mod error;
pub mod index;
pub mod metric;
pub mod progress;
pub mod redis_source;
pub mod scanner;
pub mod segment;
pub mod source;
pub mod tree;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use config::InventoryConfig;
pub use error::{KeyscopeError, Result};
pub use index::InventoryIndex;
pub use metric::{key_sample, Metric, Metrics};
pub use progress::{BarProgress, NoopProgress, ProgressSink};
pub use redis_source::RedisKeySource;
pub use scanner::{ScanOptions, ScanReport, Scanner};
pub use segment::Segmenter;
pub use source::{KeySink, KeySource, KeyStream};
pub use tree::{Node, Tree, AGGREGATED_SEGMENT};
