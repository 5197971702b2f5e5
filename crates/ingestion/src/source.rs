//! Byte sources feeding the producers

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use bytes::Bytes;
use contracts::{ByteSource, ContractError};
use tracing::debug;

/// File read front to back in chunks
pub struct FileSource {
    name: String,
    file: File,
}

impl FileSource {
    /// Open `path` for reading
    ///
    /// # Errors
    /// `SourceOpen`, which counts as a configuration error
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| ContractError::source_open(&name, e.to_string()))?;
        debug!(source = %name, "opened file source");
        Ok(Self { name, file })
    }
}

impl ByteSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// Fills up to `max_len` bytes, stopping early only at end of file
    fn read_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, ContractError> {
        let mut buf = vec![0u8; max_len];
        let mut filled = 0;
        while filled < max_len {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ContractError::source_read(&self.name, e.to_string())),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(Bytes::from(buf)))
    }
}

/// In-memory source, mainly for tests and generated workloads
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    remaining: Bytes,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            remaining: data.into(),
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, ContractError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let take = max_len.min(self.remaining.len());
        Ok(Some(self.remaining.split_to(take)))
    }
}
