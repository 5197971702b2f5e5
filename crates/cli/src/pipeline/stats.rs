//! Run report.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::EndpointId;
use dispatcher::{DispatchSnapshot, DispatcherError, WorkerReport};
use ingestion::{IngestionError, MetricsSnapshot, ProducerReport};
use observability::StatsSummary;
use serde::Serialize;
use tracing::warn;

/// Per-producer line of the report
#[derive(Debug, Clone, Serialize)]
pub struct ProducerSummary {
    pub source_id: Option<EndpointId>,
    pub destination_id: Option<EndpointId>,
    pub frames: u64,
    pub bytes: u64,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a run did, gathered after every thread joined
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub producers: Vec<ProducerSummary>,

    /// Frames producers wrote into the ring
    pub frames_written: u64,

    /// Frames dispatchers took out of the ring
    pub frames_read: u64,

    pub accepted: u64,
    pub rejected_total: u64,
    pub rejected: BTreeMap<String, u64>,
    pub malformed: u64,
    pub unroutable: u64,
    pub bytes_by_destination: BTreeMap<EndpointId, u64>,

    /// `Full` results producers had to retry
    pub full_retries: u64,

    pub dispatcher_errors: Vec<String>,

    /// Mean and peak fraction of the ring in use while draining
    pub ring_fill_mean: f64,
    pub ring_fill_max: f64,

    /// Drain phase ended by a stop request
    pub interrupted: bool,

    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RunReport {
    pub fn collect(
        producer_results: Vec<Result<ProducerReport, IngestionError>>,
        dispatcher_results: Vec<Result<WorkerReport, DispatcherError>>,
        ingestion: &MetricsSnapshot,
        dispatch: &DispatchSnapshot,
        occupancy: StatsSummary,
        interrupted: bool,
        duration: Duration,
    ) -> Self {
        let producers = producer_results
            .into_iter()
            .map(|result| match result {
                Ok(report) => ProducerSummary {
                    source_id: Some(report.route.source_id),
                    destination_id: Some(report.route.destination_id),
                    frames: report.frames,
                    bytes: report.bytes,
                    cancelled: report.cancelled,
                    error: None,
                },
                Err(e) => {
                    warn!(error = %e, "producer ended with error");
                    let (source_id, destination_id) = match &e {
                        IngestionError::Source {
                            source_id,
                            destination_id,
                            ..
                        } => (Some(*source_id), Some(*destination_id)),
                        IngestionError::Ring { source_id, .. }
                        | IngestionError::Panicked { source_id } => (Some(*source_id), None),
                        IngestionError::Spawn(_) => (None, None),
                    };
                    ProducerSummary {
                        source_id,
                        destination_id,
                        frames: 0,
                        bytes: 0,
                        cancelled: false,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let dispatcher_errors = dispatcher_results
            .into_iter()
            .filter_map(|r| r.err())
            .map(|e| {
                warn!(error = %e, "dispatcher worker ended with error");
                e.to_string()
            })
            .collect();

        Self {
            producers,
            frames_written: ingestion.frames_written,
            frames_read: dispatch.frames_read,
            accepted: dispatch.accepted,
            rejected_total: dispatch.rejected_total(),
            rejected: dispatch
                .rejected
                .iter()
                .map(|(reason, count)| (reason.as_str().to_string(), *count))
                .collect(),
            malformed: dispatch.malformed,
            unroutable: dispatch.unroutable,
            bytes_by_destination: dispatch.bytes_by_destination.clone(),
            full_retries: ingestion.full_retries,
            dispatcher_errors,
            ring_fill_mean: occupancy.mean,
            ring_fill_max: occupancy.max,
            interrupted,
            duration,
        }
    }

    /// Frames written but never read before the run-flag was cleared
    pub fn frames_lost(&self) -> u64 {
        self.frames_written.saturating_sub(self.frames_read)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== muxd run report ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames written: {}", self.frames_written);
        println!("   ├─ Frames read: {}", self.frames_read);
        println!("   ├─ Frames lost in ring: {}", self.frames_lost());
        println!("   ├─ Full retries: {}", self.full_retries);
        println!(
            "   └─ Ring fill: mean {:.1}%, max {:.1}%",
            self.ring_fill_mean * 100.0,
            self.ring_fill_max * 100.0
        );

        println!("\nValidation");
        println!("   ├─ Accepted: {}", self.accepted);
        println!("   ├─ Rejected: {}", self.rejected_total);
        for (reason, count) in &self.rejected {
            println!("   │   ├─ {}: {}", reason, count);
        }
        println!("   ├─ Malformed: {}", self.malformed);
        println!("   └─ Unroutable: {}", self.unroutable);

        println!("\nProducers");
        for producer in &self.producers {
            let route = match (producer.source_id, producer.destination_id) {
                (Some(from), Some(to)) => format!("{from} -> {to}"),
                (Some(from), None) => format!("{from} -> ?"),
                _ => "?".to_string(),
            };
            match &producer.error {
                Some(e) => println!("   ├─ {route}: failed ({e})"),
                None => println!(
                    "   ├─ {route}: {} frames, {} bytes{}",
                    producer.frames,
                    producer.bytes,
                    if producer.cancelled { " (cancelled)" } else { "" }
                ),
            }
        }

        println!("\nDestinations");
        for (destination, bytes) in &self.bytes_by_destination {
            println!("   ├─ {destination}: {bytes} bytes");
        }

        if !self.dispatcher_errors.is_empty() {
            println!("\nDispatcher errors");
            for e in &self.dispatcher_errors {
                println!("   ├─ {e}");
            }
        }

        if self.interrupted {
            println!("\nRun was interrupted before the drain window closed.");
        }

        println!();
    }
}
