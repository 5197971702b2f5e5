//! MemorySink - collects payloads in a shared buffer

use std::sync::Arc;

use contracts::{ByteSink, ContractError};
use parking_lot::Mutex;

/// Sink backed by a shared in-memory buffer
///
/// Clones share the buffer, so a test can keep one clone and read back what
/// the dispatcher pool appended through the other.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Copy of everything appended so far
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl ByteSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        self.data.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
