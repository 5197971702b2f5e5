//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Phase, Pipeline, PipelineConfig, StopHandle};
pub use stats::{ProducerSummary, RunReport};
