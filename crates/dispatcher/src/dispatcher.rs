//! Dispatcher pool - workers draining the ring into the sink table

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{RunBlueprint, MESSAGE_SIZE};
use metrics::{counter, gauge};
use ring_buffer::{FrameCodec, RingBuffer, RingError};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::DispatcherError;
use crate::filter::FrameFilter;
use crate::metrics::DispatchMetrics;
use crate::sink_table::SinkTable;

/// Pause after a drain pass, in microseconds
const IDLE_JITTER_US: std::ops::RangeInclusive<u64> = 1..=99;

/// Pause after each sink append, in microseconds
const APPEND_JITTER_US: std::ops::RangeInclusive<u64> = 25..=75;

/// Dispatcher pool configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker threads
    pub workers: usize,

    /// Initial read buffer per worker; grown on demand
    pub read_buffer_len: usize,

    /// Sleep random jitter after appends and drain passes
    pub pacing: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            read_buffer_len: MESSAGE_SIZE,
            pacing: true,
        }
    }
}

impl DispatcherConfig {
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Self {
        Self {
            workers: blueprint.dispatch.workers,
            pacing: blueprint.dispatch.pacing,
            ..Default::default()
        }
    }

    fn jitter(&self, range: std::ops::RangeInclusive<u64>) {
        if self.pacing {
            thread::sleep(Duration::from_micros(rand::random_range(range)));
        } else {
            thread::yield_now();
        }
    }
}

/// What one worker did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub frames: u64,
}

/// Fixed-size pool of dispatcher workers
pub struct DispatcherPool {
    config: DispatcherConfig,
    ring: Arc<RingBuffer>,
    sinks: Arc<SinkTable>,
    filter: FrameFilter,
    metrics: Arc<DispatchMetrics>,
}

impl DispatcherPool {
    pub fn new(config: DispatcherConfig, ring: Arc<RingBuffer>, sinks: Arc<SinkTable>) -> Self {
        let metrics = Arc::new(DispatchMetrics::new(sinks.destinations()));
        Self {
            config,
            ring,
            sinks,
            filter: FrameFilter::default(),
            metrics,
        }
    }

    /// Replace the default frame filter
    pub fn with_filter(mut self, filter: FrameFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    pub fn sinks(&self) -> Arc<SinkTable> {
        self.sinks.clone()
    }

    /// Spawn the workers; they run until `running` is cleared
    #[instrument(name = "dispatcher_pool_start", skip_all, fields(workers = self.config.workers))]
    pub fn start(&self, running: Arc<AtomicBool>) -> Result<RunningDispatchers, DispatcherError> {
        info!(sinks = self.sinks.len(), "starting dispatcher pool");
        let mut handles = Vec::with_capacity(self.config.workers);

        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                config: self.config.clone(),
                ring: self.ring.clone(),
                sinks: self.sinks.clone(),
                filter: self.filter.clone(),
                metrics: self.metrics.clone(),
            };
            let running = running.clone();

            let handle = thread::Builder::new()
                .name(format!("dispatcher-{id}"))
                .spawn(move || worker.run(&running))?;
            handles.push((id, handle));
        }

        Ok(RunningDispatchers { handles })
    }
}

/// Handles of started dispatcher workers
pub struct RunningDispatchers {
    handles: Vec<(usize, JoinHandle<Result<WorkerReport, DispatcherError>>)>,
}

impl RunningDispatchers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Join every worker; call after the run-flag was cleared
    pub fn join_all(self) -> Vec<Result<WorkerReport, DispatcherError>> {
        self.handles
            .into_iter()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(DispatcherError::Panicked { worker }))
            })
            .collect()
    }
}

enum Outcome {
    Delivered,
    Rejected,
    Skipped,
}

struct Worker {
    id: usize,
    config: DispatcherConfig,
    ring: Arc<RingBuffer>,
    sinks: Arc<SinkTable>,
    filter: FrameFilter,
    metrics: Arc<DispatchMetrics>,
}

impl Worker {
    #[instrument(name = "dispatcher_worker", skip_all, fields(worker = self.id))]
    fn run(self, running: &AtomicBool) -> Result<WorkerReport, DispatcherError> {
        debug!("worker started");
        let mut buf = vec![0u8; self.config.read_buffer_len];
        let mut frames = 0u64;

        while running.load(Ordering::Relaxed) {
            // Drain until empty, a rejection, or shutdown
            while running.load(Ordering::Relaxed) {
                let len = match self.ring.read(&mut buf) {
                    Ok(len) => len,
                    Err(RingError::TooSmall { required }) => {
                        trace!(required, "growing read buffer");
                        buf.resize(required, 0);
                        continue;
                    }
                    Err(RingError::Empty) => break,
                    Err(e) => {
                        warn!(error = %e, "unexpected ring error");
                        break;
                    }
                };

                frames += 1;
                match self.handle(&buf[..len]) {
                    Ok(Outcome::Rejected) => break,
                    Ok(Outcome::Delivered) => self.config.jitter(APPEND_JITTER_US),
                    Ok(Outcome::Skipped) => {}
                    Err(e) => {
                        error!(error = %e, "sink failed, stopping worker");
                        return Err(e);
                    }
                }
            }

            gauge!("muxd_ring_available_bytes").set(self.ring.available_to_read() as f64);
            self.config.jitter(IDLE_JITTER_US);
        }

        debug!(frames, "worker stopped");
        Ok(WorkerReport {
            worker: self.id,
            frames,
        })
    }

    fn handle(&self, message: &[u8]) -> Result<Outcome, DispatcherError> {
        self.metrics.record_read();

        let frame = match FrameCodec::decode(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                self.metrics.record_malformed();
                counter!("muxd_frames_malformed_total").increment(1);
                return Ok(Outcome::Skipped);
            }
        };

        if let Err(reason) = self.filter.validate(&frame) {
            debug!(
                source_id = frame.source_id,
                destination_id = frame.destination_id,
                sequence = frame.sequence,
                %reason,
                "frame rejected"
            );
            self.metrics.record_rejected(reason);
            counter!("muxd_frames_rejected_total", "reason" => reason.as_str()).increment(1);
            return Ok(Outcome::Rejected);
        }

        self.metrics.record_accepted();
        counter!("muxd_frames_accepted_total").increment(1);

        let destination = frame.destination_id;
        let delivered = self
            .sinks
            .append(destination, &frame.payload)
            .map_err(|source| {
                self.metrics.record_sink_failure();
                DispatcherError::Sink {
                    destination,
                    source,
                }
            })?;

        if !delivered {
            warn!(destination, "no sink for destination");
            self.metrics.record_unroutable();
            counter!("muxd_frames_unroutable_total").increment(1);
            return Ok(Outcome::Skipped);
        }

        trace!(destination, sequence = frame.sequence, "frame delivered");
        self.metrics.record_bytes(destination, frame.payload.len());
        counter!("muxd_sink_bytes_total", "destination" => destination.to_string())
            .increment(frame.payload.len() as u64);
        Ok(Outcome::Delivered)
    }
}
