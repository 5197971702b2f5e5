//! Ingestion error types

use contracts::{ContractError, EndpointId};
use ring_buffer::RingError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Source failed to open or to read
    #[error("source for connection {source_id} -> {destination_id} failed: {source}")]
    Source {
        source_id: EndpointId,
        destination_id: EndpointId,
        source: ContractError,
    },

    /// Ring buffer refused the frame for good (e.g. oversized)
    #[error("ring buffer rejected frame from source {source_id}: {source}")]
    Ring {
        source_id: EndpointId,
        source: RingError,
    },

    /// Producer thread could not be spawned
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Producer thread panicked
    #[error("producer thread for source {source_id} panicked")]
    Panicked { source_id: EndpointId },
}

impl IngestionError {
    /// Whether this error aborts the run before any task starts
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Source { source, .. } if source.is_configuration())
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
