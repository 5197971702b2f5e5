//! Dispatcher error types

use contracts::EndpointId;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink failed mid-run or while closing
    #[error("sink for destination {destination} failed: {source}")]
    Sink {
        destination: EndpointId,
        source: contracts::ContractError,
    },

    /// Worker thread panicked
    #[error("dispatcher worker {worker} panicked")]
    Panicked { worker: usize },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
