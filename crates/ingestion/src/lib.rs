//! # Ingestion
//!
//! Producer side of the pipeline.
//!
//! Responsibilities:
//! - Open one `ByteSource` per connection (`FileSource`, `MemorySource`)
//! - Chunk, frame and sequence the source bytes
//! - Retry ring buffer writes under backpressure with randomized backoff
//! - Run each producer on its own thread and collect `ProducerReport`s
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let pipeline = IngestionPipeline::from_blueprint(&blueprint)?;
//! let producers = pipeline.start_all(ring.clone(), running.clone())?;
//! for report in producers.join_all() {
//!     println!("{:?}", report?);
//! }
//! ```

mod config;
mod error;
mod pipeline;
mod producer;
mod source;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot, ProducerConfig, CHUNK_JITTER_US, FULL_BACKOFF_US};
pub use error::{IngestionError, Result};
pub use pipeline::{IngestionPipeline, RunningProducers};
pub use producer::{Producer, ProducerReport};
pub use source::{FileSource, MemorySource};
