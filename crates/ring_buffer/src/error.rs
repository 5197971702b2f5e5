//! Ring buffer error types

use thiserror::Error;

/// Ring buffer outcomes other than success
///
/// `Full` and `Empty` are transient and expected: callers retry them in their
/// own loops. `TooSmall` leaves the stored message untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Not enough free space for header + message
    #[error("ring buffer full")]
    Full,

    /// Nothing to read
    #[error("ring buffer empty")]
    Empty,

    /// Caller buffer smaller than the stored message
    #[error("output buffer too small: message needs {required} bytes")]
    TooSmall { required: usize },

    /// Message can never fit, even into an empty buffer
    #[error("message of {len} bytes exceeds ring limit of {max} bytes")]
    Oversized { len: usize, max: usize },

    /// Capacity cannot hold a length header plus headroom
    #[error("ring capacity {capacity} below minimum {min}")]
    InvalidCapacity { capacity: usize, min: usize },
}

impl RingError {
    /// Whether the caller is expected to simply retry later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Full | Self::Empty)
    }
}
