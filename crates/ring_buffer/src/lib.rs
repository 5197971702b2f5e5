//! # Ring Buffer
//!
//! Bounded, thread-safe, variable-length message ring buffer shared by all
//! producers and dispatchers, plus the codec that frames payloads for it.
//!
//! Responsibilities:
//! - Length-prefixed storage with wraparound-aware copies
//! - Partial-space backpressure: `Full` / `Empty` after one bounded wait
//! - Non-destructive `TooSmall` so a caller can retry with a larger buffer
//! - Routing header encode/decode (`FrameCodec`)
//!
//! ## Usage Example
//!
//! ```
//! use std::time::Duration;
//! use ring_buffer::{RingBuffer, RingError};
//!
//! let ring = RingBuffer::new(64, Duration::from_millis(10)).unwrap();
//! ring.write(b"hello").unwrap();
//!
//! let mut out = [0u8; 16];
//! let len = ring.read(&mut out).unwrap();
//! assert_eq!(&out[..len], b"hello");
//! assert!(matches!(ring.read(&mut out), Err(RingError::Empty)));
//! ```

mod codec;
mod error;
mod ring;

pub use codec::FrameCodec;
pub use contracts::LENGTH_HEADER_LEN;
pub use error::RingError;
pub use ring::RingBuffer;
