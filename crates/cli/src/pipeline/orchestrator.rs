//! Pipeline orchestrator - owns the ring buffer and every worker of a run.
//!
//! Lifecycle: `Init -> Running -> Draining -> Joined`.
//!
//! - Init: validate the blueprint, open every source, allocate the ring, open the sinks
//! - Running: start the dispatcher pool and one producer thread per connection
//! - Draining: wait out the drain window (or until idle), then clear the run-flag
//! - Joined: join producers, then dispatchers, close sinks, release the ring

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{DrainPolicy, RunBlueprint};
use dispatcher::{DispatcherConfig, DispatcherError, DispatcherPool, SinkTable, WorkerReport};
use ingestion::IngestionPipeline;
use observability::OccupancySampler;
use ring_buffer::RingBuffer;
use tokio::sync::Notify;
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use super::RunReport;
use crate::error::CliError;

/// How often the drain phase samples the ring and checks for idleness
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The run blueprint
    pub blueprint: RunBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Run phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Draining,
    Joined,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Joined => "joined",
        };
        f.write_str(name)
    }
}

/// Cloneable handle that ends the drain phase early
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    notify: Arc<Notify>,
}

impl StopHandle {
    /// Request an early stop; the run still joins normally
    pub fn stop(&self) {
        self.notify.notify_one();
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    stop: StopHandle,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the pipeline to completion
    #[instrument(name = "pipeline_run", skip(self))]
    pub async fn run(self) -> Result<RunReport> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // ===== Init =====
        enter(Phase::Init);
        ConfigLoader::validate(blueprint)
            .map_err(|e| CliError::config_validation(e.to_string()))?;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let ingestion =
            IngestionPipeline::from_blueprint(blueprint).context("Failed to open sources")?;
        let ring = Arc::new(
            RingBuffer::with_storage(
                vec![0u8; blueprint.buffer.capacity],
                blueprint.buffer.wait_timeout(),
            )
            .context("Failed to allocate ring buffer")?,
        );
        let sinks =
            Arc::new(SinkTable::from_blueprint(blueprint).context("Failed to open sinks")?);

        info!(
            capacity = ring.capacity(),
            max_message = ring.max_message_len(),
            producers = ingestion.producer_count(),
            sinks = sinks.len(),
            "Pipeline initialized"
        );

        // ===== Running =====
        enter(Phase::Running);
        let running = Arc::new(AtomicBool::new(true));
        let pool = DispatcherPool::new(
            DispatcherConfig::from_blueprint(blueprint),
            ring.clone(),
            sinks.clone(),
        );
        let dispatch_metrics = pool.metrics();
        let ingestion_metrics = ingestion.metrics();

        let dispatchers = pool
            .start(running.clone())
            .context("Failed to start dispatcher pool")?;
        let producers = match ingestion.start_all(ring.clone(), running.clone()) {
            Ok(producers) => producers,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                let joined = tokio::task::spawn_blocking(move || dispatchers.join_all()).await;
                report_aborted_join(joined);
                return Err(e).context("Failed to start producers");
            }
        };

        // ===== Draining =====
        enter(Phase::Draining);
        let policy = blueprint.dispatch.drain_policy;
        let deadline = tokio::time::Instant::now() + blueprint.dispatch.drain_window();
        let mut occupancy = OccupancySampler::new(ring.capacity());
        let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
        let mut interrupted = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    debug!("Drain window elapsed");
                    break;
                }
                _ = self.stop.notify.notified() => {
                    warn!("Stop requested, ending drain phase early");
                    interrupted = true;
                    break;
                }
            }

            occupancy.sample(ring.available_to_read());
            if policy == DrainPolicy::UntilIdle && producers.all_finished() && ring.is_empty() {
                debug!("Producers finished and ring empty");
                break;
            }
        }
        running.store(false, Ordering::SeqCst);

        let frames_in_ring = ring.available_to_read();
        if frames_in_ring > 0 {
            warn!(
                bytes = frames_in_ring,
                "Run-flag cleared with data still buffered, it will be discarded"
            );
        }

        // ===== Joined =====
        let producer_results = tokio::task::spawn_blocking(move || producers.join_all())
            .await
            .map_err(|e| CliError::pipeline_execution(format!("producer join failed: {e}")))?;
        let dispatcher_results = tokio::task::spawn_blocking(move || dispatchers.join_all())
            .await
            .map_err(|e| CliError::pipeline_execution(format!("dispatcher join failed: {e}")))?;
        enter(Phase::Joined);

        sinks.close_all().context("Failed to close sinks")?;

        drop(pool);
        match Arc::try_unwrap(ring) {
            Ok(ring) => {
                let storage = ring.into_storage();
                debug!(bytes = storage.len(), "Ring buffer released");
            }
            Err(_) => warn!("Ring buffer still shared after join"),
        }

        let report = RunReport::collect(
            producer_results,
            dispatcher_results,
            &ingestion_metrics.snapshot(),
            &dispatch_metrics.snapshot(),
            occupancy.summary(),
            interrupted,
            start_time.elapsed(),
        );
        observability::record_run_completed(report.duration.as_secs_f64() * 1000.0);

        info!(
            frames_written = report.frames_written,
            accepted = report.accepted,
            rejected = report.rejected_total,
            duration_secs = report.duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );

        Ok(report)
    }
}

fn enter(phase: Phase) {
    info!(%phase, "Entering phase");
}

/// Log dispatcher failures of a run aborted in `Running`; returns how many failed
fn report_aborted_join(
    joined: std::result::Result<Vec<std::result::Result<WorkerReport, DispatcherError>>, JoinError>,
) -> usize {
    match joined {
        Ok(results) => results
            .into_iter()
            .filter_map(|r| r.err())
            .inspect(|err| warn!(error = %err, "dispatcher worker failed during aborted start"))
            .count(),
        Err(join) => {
            warn!(error = %join, "dispatcher join failed during aborted start");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConnectionConfig, SinkType};
    use std::fs;
    use std::path::Path;

    fn blueprint(dir: &Path, inputs: &[(u64, u64, &[u8])]) -> RunBlueprint {
        let mut bp: RunBlueprint = config_loader::ConfigLoader::load_from_str(
            r#"
            [dispatch]
            workers = 4
            drain_window_ms = 5000
            drain_policy = "until_idle"
            pacing = false

            [[connections]]
            source_id = 0
            destination_id = 1
            source = "placeholder"
            "#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        bp.sinks.kind = SinkType::File;
        bp.sinks.output_dir = dir.join("out");
        bp.connections = inputs
            .iter()
            .enumerate()
            .map(|(i, (from, to, data))| {
                let path = dir.join(format!("input{i}.txt"));
                fs::write(&path, data).unwrap();
                ConnectionConfig {
                    source_id: *from,
                    destination_id: *to,
                    source: path,
                }
            })
            .collect();
        bp
    }

    #[tokio::test]
    async fn test_until_idle_delivers_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let text: Vec<u8> = (0..2000u32).map(|i| b'0' + (i % 10) as u8).collect();
        let mut bp = blueprint(dir.path(), &[(1, 11, &text)]);
        // one worker, so appends happen in ring order
        bp.dispatch.workers = 1;

        let report = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
        })
        .run()
        .await
        .unwrap();

        assert!(!report.interrupted);
        assert_eq!(report.rejected_total, 0);
        assert_eq!(report.accepted, report.frames_written);
        assert_eq!(fs::read(dir.path().join("out/11.txt")).unwrap(), text);
    }

    #[tokio::test]
    async fn test_rejected_routes_never_reach_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            dir.path(),
            &[(2, 12, b"kept payload"), (20, 22, b"sentinel sum"), (5, 5, b"self")],
        );

        let report = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
        })
        .run()
        .await
        .unwrap();

        assert_eq!(report.frames_written, 3);
        assert_eq!(report.accepted + report.rejected_total, 3);
        assert_eq!(fs::read(dir.path().join("out/12.txt")).unwrap(), b"kept payload");
        assert!(fs::read(dir.path().join("out/22.txt")).unwrap().is_empty());
        assert!(fs::read(dir.path().join("out/5.txt")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_aborts_in_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint(dir.path(), &[(1, 11, b"x")]);
        bp.connections[0].source = dir.path().join("missing.txt");

        let err = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
        })
        .run()
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Failed to open sources"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_aborted_join_counts_failed_workers() {
        let joined = Ok(vec![
            Ok(WorkerReport {
                worker: 0,
                frames: 3,
            }),
            Err(DispatcherError::Panicked { worker: 1 }),
            Err(DispatcherError::Panicked { worker: 2 }),
        ]);
        assert_eq!(report_aborted_join(joined), 2);
        assert_eq!(report_aborted_join(Ok(Vec::new())), 0);
    }

    #[tokio::test]
    async fn test_aborted_join_reports_panicked_join_task() {
        let joined = tokio::task::spawn_blocking(|| -> Vec<_> { panic!("join task died") }).await;
        assert_eq!(report_aborted_join(joined), 1);
    }

    #[tokio::test]
    async fn test_oversized_capacity_aborts_before_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint(dir.path(), &[(1, 11, b"x")]);
        bp.buffer.capacity = usize::MAX;

        let err = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
        })
        .run()
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Configuration validation failed"), "got: {err}");
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_stop_handle_ends_fixed_window_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint(dir.path(), &[(1, 11, b"short")]);
        bp.dispatch.drain_policy = DrainPolicy::FixedWindow;
        bp.dispatch.drain_window_ms = 60_000;

        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
        });
        let stop = pipeline.stop_handle();

        let started = Instant::now();
        let task = tokio::spawn(pipeline.run());
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.stop();

        let report = task.await.unwrap().unwrap();
        assert!(report.interrupted);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(fs::read(dir.path().join("out/11.txt")).unwrap(), b"short");
    }
}
