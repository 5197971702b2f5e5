//! # Dispatcher
//!
//! Consumer side of the pipeline.
//!
//! Responsibilities:
//! - Drain the shared ring buffer with a fixed pool of worker threads
//! - Decode and validate every frame (`FrameFilter`)
//! - Route accepted payloads to the sink of their destination (`SinkTable`)
//! - Count everything in `DispatchMetrics`

pub mod compare;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod sink_table;
pub mod sinks;

pub use compare::{compare_bytes, compare_files, FileComparison};
pub use contracts::ByteSink;
pub use dispatcher::{DispatcherConfig, DispatcherPool, RunningDispatchers, WorkerReport};
pub use error::DispatcherError;
pub use filter::{contains_subsequence, FrameFilter, RejectReason, BLOCKED_MARKER};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use sink_table::{SharedSink, SinkTable};
pub use sinks::{FileSink, LogSink, MemorySink};
