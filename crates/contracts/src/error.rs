//! Layered error definitions
//!
//! Categorized by source: config / source / sink / frame

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Errors =====
    /// Source could not be opened at startup
    #[error("source '{source_name}' open error: {message}")]
    SourceOpen {
        source_name: String,
        message: String,
    },

    /// Source failed mid-stream
    #[error("source '{source_name}' read error: {message}")]
    SourceRead {
        source_name: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink could not be opened at startup
    #[error("sink '{sink_name}' open error: {message}")]
    SinkOpen { sink_name: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Frame Errors =====
    /// Encoded frame shorter than the routing header
    #[error("malformed frame: {len} bytes, routing header needs {required}")]
    MalformedFrame { len: usize, required: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source open error
    pub fn source_open(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create source read error
    pub fn source_read(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create sink open error
    pub fn sink_open(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkOpen {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the run before any task starts
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::SourceOpen { .. }
                | Self::SinkOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(ContractError::config_validation("x", "bad").is_configuration());
        assert!(ContractError::source_open("in.txt", "missing").is_configuration());
        assert!(ContractError::sink_open("11", "denied").is_configuration());
        assert!(!ContractError::sink_write("11", "disk full").is_configuration());
        assert!(!ContractError::MalformedFrame {
            len: 3,
            required: 24
        }
        .is_configuration());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = ContractError::source_read("rndtxt1.txt", "unexpected eof");
        assert_eq!(
            err.to_string(),
            "source 'rndtxt1.txt' read error: unexpected eof"
        );
    }
}
