//! Ingestion Pipeline main entry

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{Route, RunBlueprint};
use ring_buffer::RingBuffer;
use tracing::{debug, error, info, instrument};

use crate::config::{IngestionMetrics, ProducerConfig};
use crate::error::{IngestionError, Result};
use crate::producer::{Producer, ProducerReport};
use crate::source::FileSource;

/// Ingestion Pipeline
///
/// Holds every producer of a run. All sources are opened up front, so a
/// missing input aborts the run before any thread starts.
pub struct IngestionPipeline {
    producers: Vec<Producer>,
    metrics: Arc<IngestionMetrics>,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionPipeline {
    pub fn new() -> Self {
        Self {
            producers: Vec::new(),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Open one file source per connection
    #[instrument(name = "ingestion_from_blueprint", skip_all)]
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Result<Self> {
        let config = ProducerConfig::from_blueprint(blueprint);
        let mut pipeline = Self::new();

        for conn in &blueprint.connections {
            let source = FileSource::open(&conn.source).map_err(|source| IngestionError::Source {
                source_id: conn.source_id,
                destination_id: conn.destination_id,
                source,
            })?;
            pipeline.register(Producer::new(conn.route(), Box::new(source), config.clone()));
        }

        info!(count = pipeline.producer_count(), "opened producer sources");
        Ok(pipeline)
    }

    pub fn register(&mut self, producer: Producer) {
        debug!(
            source_id = producer.route().source_id,
            destination_id = producer.route().destination_id,
            source = %producer.source_name(),
            "registered producer"
        );
        self.producers.push(producer);
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Spawn one named thread per producer
    #[instrument(name = "ingestion_start_all", skip_all)]
    pub fn start_all(
        self,
        ring: Arc<RingBuffer>,
        running: Arc<AtomicBool>,
    ) -> Result<RunningProducers> {
        info!(count = self.producers.len(), "starting producers");
        let mut handles = Vec::with_capacity(self.producers.len());

        for producer in self.producers {
            let route = producer.route();
            let ring = ring.clone();
            let running = running.clone();
            let metrics = self.metrics.clone();

            let handle = thread::Builder::new()
                .name(format!("producer-{}", route.source_id))
                .spawn(move || {
                    let result = producer.run(&ring, &running, &metrics);
                    match &result {
                        Ok(_) => metrics.record_finished(),
                        Err(e) => {
                            error!(source_id = route.source_id, error = %e, "producer failed");
                            metrics.record_failed();
                        }
                    }
                    result
                })?;
            handles.push((route, handle));
        }

        Ok(RunningProducers { handles })
    }
}

/// Handles of started producer threads
pub struct RunningProducers {
    handles: Vec<(Route, JoinHandle<Result<ProducerReport>>)>,
}

impl RunningProducers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether every producer thread has returned
    pub fn all_finished(&self) -> bool {
        self.handles.iter().all(|(_, h)| h.is_finished())
    }

    /// Join every producer, in registration order
    pub fn join_all(self) -> Vec<Result<ProducerReport>> {
        self.handles
            .into_iter()
            .map(|(route, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(IngestionError::Panicked {
                        source_id: route.source_id,
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use contracts::{ConnectionConfig, DispatchConfig};
    use ring_buffer::FrameCodec;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new();
        assert_eq!(pipeline.producer_count(), 0);
    }

    #[test]
    fn test_missing_source_aborts_before_start() {
        let blueprint = RunBlueprint {
            version: Default::default(),
            buffer: Default::default(),
            dispatch: DispatchConfig::default(),
            sinks: Default::default(),
            connections: vec![ConnectionConfig {
                source_id: 1,
                destination_id: 11,
                source: "/definitely/not/here.txt".into(),
            }],
        };

        let err = IngestionPipeline::from_blueprint(&blueprint).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_blueprint_opens_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"some input").unwrap();

        let blueprint = RunBlueprint {
            version: Default::default(),
            buffer: Default::default(),
            dispatch: DispatchConfig::default(),
            sinks: Default::default(),
            connections: vec![ConnectionConfig {
                source_id: 1,
                destination_id: 11,
                source: file.path().to_path_buf(),
            }],
        };

        let pipeline = IngestionPipeline::from_blueprint(&blueprint).unwrap();
        assert_eq!(pipeline.producer_count(), 1);
    }

    #[test]
    fn test_start_and_join_all() {
        let ring = Arc::new(RingBuffer::new(4096, Duration::from_millis(1)).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        let config = ProducerConfig {
            max_payload: 8,
            pacing: false,
        };

        let mut pipeline = IngestionPipeline::new();
        for id in 1..=3u64 {
            let data = format!("producer {id} payload");
            pipeline.register(Producer::new(
                Route::new(id, 10 + id),
                Box::new(MemorySource::new(format!("mem-{id}"), data)),
                config.clone(),
            ));
        }
        let metrics = pipeline.metrics();

        let running_producers = pipeline.start_all(ring.clone(), running).unwrap();
        assert_eq!(running_producers.len(), 3);
        let reports = running_producers.join_all();

        assert!(reports.iter().all(|r| r.is_ok()));
        let total: u64 = reports.iter().map(|r| r.as_ref().unwrap().frames).sum();
        assert_eq!(metrics.snapshot().frames_written, total);
        assert_eq!(metrics.snapshot().producers_finished, 3);

        let mut decoded = 0;
        while let Ok(message) = ring.read_to_vec(64) {
            FrameCodec::decode(&message).unwrap();
            decoded += 1;
        }
        assert_eq!(decoded, total);
    }
}
