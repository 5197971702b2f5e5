//! Metric names, descriptions and run-level aggregation

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

pub const FRAMES_WRITTEN: &str = "muxd_frames_written_total";
pub const FRAMES_ACCEPTED: &str = "muxd_frames_accepted_total";
pub const FRAMES_REJECTED: &str = "muxd_frames_rejected_total";
pub const FRAMES_MALFORMED: &str = "muxd_frames_malformed_total";
pub const FRAMES_UNROUTABLE: &str = "muxd_frames_unroutable_total";
pub const RING_FULL: &str = "muxd_ring_full_total";
pub const RING_EMPTY: &str = "muxd_ring_empty_total";
pub const RING_AVAILABLE_BYTES: &str = "muxd_ring_available_bytes";
pub const RING_FILL_RATIO: &str = "muxd_ring_fill_ratio";
pub const SINK_BYTES: &str = "muxd_sink_bytes_total";
pub const RUNS: &str = "muxd_runs_total";
pub const RUN_DURATION_MS: &str = "muxd_run_duration_ms";

/// Register descriptions for every muxd metric
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(FRAMES_WRITTEN, "Frames written into the ring by producers");
    describe_counter!(FRAMES_ACCEPTED, "Frames that passed validation");
    describe_counter!(FRAMES_REJECTED, "Frames dropped by validation, by reason");
    describe_counter!(FRAMES_MALFORMED, "Ring messages shorter than a routing header");
    describe_counter!(FRAMES_UNROUTABLE, "Accepted frames without a sink");
    describe_counter!(RING_FULL, "Writes that found the ring full");
    describe_counter!(RING_EMPTY, "Reads that found the ring empty");
    describe_gauge!(RING_AVAILABLE_BYTES, Unit::Bytes, "Bytes stored in the ring");
    describe_histogram!(RING_FILL_RATIO, "Sampled ring occupancy, 0.0 to 1.0");
    describe_counter!(SINK_BYTES, Unit::Bytes, "Payload bytes appended, by destination");
    describe_counter!(RUNS, "Completed runs");
    describe_histogram!(RUN_DURATION_MS, Unit::Milliseconds, "Wall-clock run duration");
}

/// Record the end of one run
pub fn record_run_completed(duration_ms: f64) {
    counter!(RUNS).increment(1);
    histogram!(RUN_DURATION_MS).record(duration_ms);
}

/// Samples ring occupancy during a run
#[derive(Debug, Clone)]
pub struct OccupancySampler {
    capacity: usize,
    stats: RunningStats,
}

impl OccupancySampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stats: RunningStats::default(),
        }
    }

    /// Record `stored` bytes out of the ring capacity
    pub fn sample(&mut self, stored: usize) {
        let ratio = if self.capacity == 0 {
            0.0
        } else {
            stored as f64 / self.capacity as f64
        };
        gauge!(RING_AVAILABLE_BYTES).set(stored as f64);
        histogram!(RING_FILL_RATIO).record(ratio);
        self.stats.push(ratio);
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(&self.stats)
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
