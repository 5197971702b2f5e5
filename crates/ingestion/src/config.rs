//! Producer configuration and metrics

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{RunBlueprint, DEFAULT_MAX_PAYLOAD};

/// Jitter between two chunks of one producer, in microseconds
pub const CHUNK_JITTER_US: RangeInclusive<u64> = 1..=100;

/// Backoff between two `Full` retries of the same frame, in microseconds
pub const FULL_BACKOFF_US: RangeInclusive<u64> = 25..=75;

/// Producer configuration
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Largest payload chunk read from the source per frame
    pub max_payload: usize,

    /// Sleep random jitter between chunks and between retries
    pub pacing: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            pacing: true,
        }
    }
}

impl ProducerConfig {
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Self {
        Self {
            max_payload: blueprint.dispatch.max_payload,
            pacing: blueprint.dispatch.pacing,
        }
    }

    pub(crate) fn chunk_jitter(&self) -> Option<Duration> {
        self.pacing
            .then(|| Duration::from_micros(rand::random_range(CHUNK_JITTER_US)))
    }

    pub(crate) fn full_backoff(&self) -> Option<Duration> {
        self.pacing
            .then(|| Duration::from_micros(rand::random_range(FULL_BACKOFF_US)))
    }
}

/// Ingestion metrics shared by all producers of a run
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames written into the ring buffer
    pub frames_written: AtomicU64,

    /// Payload bytes written (routing header excluded)
    pub bytes_written: AtomicU64,

    /// `Full` results that led to a retry
    pub full_retries: AtomicU64,

    /// Producers that reached end of stream
    pub producers_finished: AtomicU64,

    /// Producers that stopped on an error
    pub producers_failed: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self, payload_len: usize) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub fn record_full(&self) {
        self.full_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finished(&self) {
        self.producers_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.producers_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_written: self.frames_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            full_retries: self.full_retries.load(Ordering::Relaxed),
            producers_finished: self.producers_finished.load(Ordering::Relaxed),
            producers_failed: self.producers_failed.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_written: u64,
    pub bytes_written: u64,
    pub full_retries: u64,
    pub producers_finished: u64,
    pub producers_failed: u64,
}
