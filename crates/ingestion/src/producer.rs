//! Producer: one source, one route, one writer into the shared ring

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use contracts::{ByteSource, Frame, Route};
use metrics::counter;
use ring_buffer::{FrameCodec, RingBuffer, RingError};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{IngestionMetrics, ProducerConfig};
use crate::error::{IngestionError, Result};

/// Outcome of one producer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub route: Route,

    /// Frames written into the ring
    pub frames: u64,

    /// Payload bytes written
    pub bytes: u64,

    /// Stopped by the run-flag before the source was exhausted
    pub cancelled: bool,
}

impl ProducerReport {
    fn new(route: Route) -> Self {
        Self {
            route,
            frames: 0,
            bytes: 0,
            cancelled: false,
        }
    }
}

/// Reads chunks from its source and writes them as frames into the ring
pub struct Producer {
    route: Route,
    source: Box<dyn ByteSource>,
    config: ProducerConfig,
}

impl Producer {
    pub fn new(route: Route, source: Box<dyn ByteSource>, config: ProducerConfig) -> Self {
        Self {
            route,
            source,
            config,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Run until the source is exhausted or `running` is cleared
    ///
    /// Sequence numbers start at 0 and grow by one per written frame.
    #[instrument(
        name = "producer_run",
        skip_all,
        fields(source_id = self.route.source_id, destination_id = self.route.destination_id)
    )]
    pub fn run(
        mut self,
        ring: &RingBuffer,
        running: &AtomicBool,
        metrics: &IngestionMetrics,
    ) -> Result<ProducerReport> {
        let mut report = ProducerReport::new(self.route);
        debug!(source = %self.source.name(), "producer started");

        loop {
            if !running.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }

            let chunk = self
                .source
                .read_chunk(self.config.max_payload)
                .map_err(|source| IngestionError::Source {
                    source_id: self.route.source_id,
                    destination_id: self.route.destination_id,
                    source,
                })?;
            let Some(chunk) = chunk.filter(|c| !c.is_empty()) else {
                break;
            };

            let payload_len = chunk.len();
            let frame = Frame::new(self.route, report.frames, chunk);
            let message = FrameCodec::encode(&frame);

            if !self.write_with_retry(ring, &message, running, metrics)? {
                report.cancelled = true;
                break;
            }

            trace!(sequence = frame.sequence, len = payload_len, "frame written");
            metrics.record_frame(payload_len);
            counter!("muxd_frames_written_total").increment(1);
            report.frames += 1;
            report.bytes += payload_len as u64;

            if let Some(jitter) = self.config.chunk_jitter() {
                thread::sleep(jitter);
            }
        }

        if report.cancelled {
            warn!(frames = report.frames, "producer cancelled before end of stream");
        } else {
            info!(frames = report.frames, bytes = report.bytes, "producer finished");
        }
        Ok(report)
    }

    /// Returns `Ok(false)` if the run-flag was cleared while the ring stayed full
    fn write_with_retry(
        &self,
        ring: &RingBuffer,
        message: &[u8],
        running: &AtomicBool,
        metrics: &IngestionMetrics,
    ) -> Result<bool> {
        loop {
            match ring.write(message) {
                Ok(()) => return Ok(true),
                Err(RingError::Full) => {
                    metrics.record_full();
                    if !running.load(Ordering::Relaxed) {
                        return Ok(false);
                    }
                    match self.config.full_backoff() {
                        Some(backoff) => thread::sleep(backoff),
                        None => thread::yield_now(),
                    }
                }
                Err(source) => {
                    return Err(IngestionError::Ring {
                        source_id: self.route.source_id,
                        source,
                    })
                }
            }
        }
    }
}
