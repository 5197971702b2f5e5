//! ByteSource trait - producer input abstraction
//!
//! Anything that yields sequential byte chunks: a file, a socket, a generator.

use bytes::Bytes;

use crate::ContractError;

/// Sequential byte source
///
/// Producers pull from a source until it reports end of stream.
pub trait ByteSource: Send {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Read the next chunk of at most `max_len` bytes
    ///
    /// Returns `Ok(None)` once the source is exhausted. A chunk shorter than
    /// `max_len` is only returned right before the end of stream.
    ///
    /// # Errors
    /// Returns a read error (should include context)
    fn read_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, ContractError>;
}
