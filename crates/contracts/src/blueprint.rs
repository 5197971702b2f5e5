//! RunBlueprint - Config Loader output
//!
//! Describes one complete run: buffer sizing, dispatcher pool, sink output and
//! the connection list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::{EndpointId, Route, DEFAULT_MAX_PAYLOAD, ROUTING_HEADER_LEN};

/// Width of the ring buffer's length prefix
pub const LENGTH_HEADER_LEN: usize = std::mem::size_of::<usize>();

/// Largest ring buffer a configuration may allocate (64 MiB)
pub const MAX_BUFFER_CAPACITY: usize = 64 * 1024 * 1024;

/// Longest single bounded wait inside a ring read or write
pub const MAX_WAIT_TIMEOUT_MS: u64 = 60_000;

/// Longest drain window (one day)
pub const MAX_DRAIN_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Shared ring buffer sizing
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Dispatcher pool and drain settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Output sink settings
    #[serde(default)]
    pub sinks: SinkConfig,

    /// One entry per producer
    pub connections: Vec<ConnectionConfig>,
}

/// Ring buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Backing region size in bytes (one byte is kept as headroom)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Bound of the single wait a read/write call may perform
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

fn default_capacity() -> usize {
    1024
}

fn default_wait_timeout_ms() -> u64 {
    100
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

impl BufferConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Dispatcher pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of dispatcher workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Wall-clock window before the run-flag is cleared
    #[serde(default = "default_drain_window_ms")]
    pub drain_window_ms: u64,

    /// How the drain phase decides to stop the dispatchers
    #[serde(default)]
    pub drain_policy: DrainPolicy,

    /// Largest payload chunk a producer reads per frame
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,

    /// Random jitter between producer sends and dispatcher writes
    #[serde(default = "default_pacing")]
    pub pacing: bool,
}

fn default_workers() -> usize {
    4
}

fn default_drain_window_ms() -> u64 {
    5000
}

fn default_max_payload() -> usize {
    DEFAULT_MAX_PAYLOAD
}

fn default_pacing() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            drain_window_ms: default_drain_window_ms(),
            drain_policy: DrainPolicy::default(),
            max_payload: default_max_payload(),
            pacing: default_pacing(),
        }
    }
}

impl DispatchConfig {
    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.drain_window_ms)
    }
}

/// Drain phase policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Clear the run-flag after the fixed window; frames still in flight are lost
    #[default]
    FixedWindow,
    /// Clear the run-flag as soon as every producer joined and the buffer is
    /// empty, never later than the window
    UntilIdle,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink type
    #[serde(default)]
    pub kind: SinkType,

    /// Directory holding `<destination_id>.txt` files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkType::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Append payloads to one file per destination
    #[default]
    File,
    /// Log payload summaries only
    Log,
}

/// One producer connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Producing endpoint
    pub source_id: EndpointId,

    /// Consuming endpoint
    pub destination_id: EndpointId,

    /// Path of the byte source
    pub source: PathBuf,
}

impl ConnectionConfig {
    pub fn route(&self) -> Route {
        Route::new(self.source_id, self.destination_id)
    }
}

impl RunBlueprint {
    /// Routes of all connections, in configuration order
    pub fn routes(&self) -> Vec<Route> {
        self.connections.iter().map(ConnectionConfig::route).collect()
    }

    /// Distinct destination ids, ascending
    pub fn destinations(&self) -> Vec<EndpointId> {
        self.connections
            .iter()
            .map(|c| c.destination_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Smallest ring capacity that can hold one maximal frame plus headroom
    ///
    /// `None` when `max_payload` is so large the sum overflows.
    pub fn min_buffer_capacity(&self) -> Option<usize> {
        (LENGTH_HEADER_LEN + ROUTING_HEADER_LEN + 1).checked_add(self.dispatch.max_payload)
    }
}
