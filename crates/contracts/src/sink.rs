//! ByteSink trait - dispatcher output interface
//!
//! Defines the abstract interface for append-only sinks keyed by destination.

use crate::ContractError;

/// Append-only byte destination
///
/// All sink implementations must implement this trait. A sink is opened
/// before the dispatcher pool starts and closed after it joins.
pub trait ByteSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append a payload
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn append(&mut self, bytes: &[u8]) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    fn close(&mut self) -> Result<(), ContractError>;
}
