//! LogSink - logs payload summaries via tracing

use contracts::{ByteSink, ContractError, EndpointId};
use tracing::{debug, info};

/// Sink that only logs what it receives
pub struct LogSink {
    name: String,
    appended: u64,
    bytes: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            appended: 0,
            bytes: 0,
        }
    }

    pub fn for_destination(destination: EndpointId) -> Self {
        Self::new(format!("log:{destination}"))
    }
}

impl ByteSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        self.appended += 1;
        self.bytes += bytes.len() as u64;
        debug!(
            sink = %self.name,
            len = bytes.len(),
            preview = %String::from_utf8_lossy(&bytes[..bytes.len().min(16)]),
            "payload received"
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            payloads = self.appended,
            bytes = self.bytes,
            "LogSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_append() {
        let mut sink = LogSink::for_destination(11);
        assert!(sink.append(b"some payload").is_ok());
        assert_eq!(sink.appended, 1);
        assert_eq!(sink.bytes, 12);
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
