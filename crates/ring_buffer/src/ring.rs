//! Length-prefixed circular byte store.
//!
//! Layout of one stored message:
//!
//! ```text
//! [len: usize LE][len bytes of message]
//! ```
//!
//! Both the header and the message may wrap past the end of the backing
//! region; copies are split exactly at the end and continue at index 0.
//!
//! One mutex guards the cursors and the backing region. Writers and readers
//! are each serialized by it, and two condition variables carry the
//! "data available" and "space freed" notifications. A blocked call releases
//! the mutex while it waits, so a writer stuck on `Full` never prevents a
//! reader from freeing space.

use std::fmt;
use std::time::Duration;

use metrics::counter;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::error::RingError;
use crate::LENGTH_HEADER_LEN;

/// Cursor pair over the owned backing region
///
/// Invariant: `read < storage.len()`, `write < storage.len()`, and the ring is
/// empty iff `read == write`. A write never lets `write` catch up with `read`.
struct RingState {
    storage: Vec<u8>,
    read: usize,
    write: usize,
}

impl RingState {
    #[inline]
    fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// `(read - write - 1) mod capacity`: free bytes minus the headroom byte
    #[inline]
    fn available_to_write(&self) -> usize {
        let cap = self.capacity();
        (self.read + cap - self.write - 1) % cap
    }

    #[inline]
    fn available_to_read(&self) -> usize {
        let cap = self.capacity();
        (self.write + cap - self.read) % cap
    }

    /// Copy `bytes` at the write cursor, splitting at the end of the region
    fn copy_in(&mut self, bytes: &[u8]) {
        let cap = self.capacity();
        let first = bytes.len().min(cap - self.write);
        self.storage[self.write..self.write + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        self.storage[..rest].copy_from_slice(&bytes[first..]);
        self.write = (self.write + bytes.len()) % cap;
    }

    /// Copy `out.len()` bytes from the read cursor, splitting at the end of the region
    fn copy_out(&mut self, out: &mut [u8]) {
        let cap = self.capacity();
        let first = out.len().min(cap - self.read);
        out[..first].copy_from_slice(&self.storage[self.read..self.read + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.storage[..rest]);
        self.read = (self.read + out.len()) % cap;
    }
}

/// Bounded multi-producer multi-consumer message ring
///
/// Every blocking call waits at most once for `wait_timeout` and then
/// returns; retrying is the caller's job.
pub struct RingBuffer {
    state: Mutex<RingState>,
    /// Signalled after a successful write, and by a writer that hit `Full`
    data_ready: Condvar,
    /// Signalled after a successful read
    space_freed: Condvar,
    capacity: usize,
    wait_timeout: Duration,
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("read", &state.read)
            .field("write", &state.write)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}

impl RingBuffer {
    /// Smallest capacity that can hold a one-byte message plus headroom
    pub const MIN_CAPACITY: usize = LENGTH_HEADER_LEN + 2;

    /// Allocate a ring of `capacity` bytes
    pub fn new(capacity: usize, wait_timeout: Duration) -> Result<Self, RingError> {
        Self::with_storage(vec![0; capacity], wait_timeout)
    }

    /// Build a ring over caller-allocated storage
    ///
    /// The region is handed back by [`RingBuffer::into_storage`].
    pub fn with_storage(storage: Vec<u8>, wait_timeout: Duration) -> Result<Self, RingError> {
        let capacity = storage.len();
        if capacity < Self::MIN_CAPACITY {
            return Err(RingError::InvalidCapacity {
                capacity,
                min: Self::MIN_CAPACITY,
            });
        }

        Ok(Self {
            state: Mutex::new(RingState {
                storage,
                read: 0,
                write: 0,
            }),
            data_ready: Condvar::new(),
            space_freed: Condvar::new(),
            capacity,
            wait_timeout,
        })
    }

    /// Tear the ring down and return its backing region
    pub fn into_storage(self) -> Vec<u8> {
        self.state.into_inner().storage
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Largest message an empty ring accepts
    #[inline]
    pub fn max_message_len(&self) -> usize {
        self.capacity - 1 - LENGTH_HEADER_LEN
    }

    /// Bytes a writer could place right now (header included), minus headroom
    pub fn available_to_write(&self) -> usize {
        self.state.lock().available_to_write()
    }

    /// Bytes currently stored (headers included)
    pub fn available_to_read(&self) -> usize {
        self.state.lock().available_to_read()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Append one message
    ///
    /// # Errors
    /// - `Full` after one bounded wait for space; the ring is unchanged
    /// - `Oversized` if the message can never fit
    pub fn write(&self, message: &[u8]) -> Result<(), RingError> {
        if message.len() > self.max_message_len() {
            return Err(RingError::Oversized {
                len: message.len(),
                max: self.max_message_len(),
            });
        }
        let required = message.len() + LENGTH_HEADER_LEN;

        let mut state = self.state.lock();
        let available = state.available_to_write();
        if available < required {
            trace!(available, required, "ring full, waiting for space");
            counter!("muxd_ring_full_total").increment(1);
            // Wake readers so they drain while we wait
            self.data_ready.notify_all();
            let result = self.space_freed.wait_for(&mut state, self.wait_timeout);
            trace!(timed_out = result.timed_out(), "ring full wait finished");
            return Err(RingError::Full);
        }

        state.copy_in(&message.len().to_le_bytes());
        state.copy_in(message);
        drop(state);

        self.data_ready.notify_one();
        Ok(())
    }

    /// Take the oldest message into `out`, returning its length
    ///
    /// # Errors
    /// - `Empty` after one bounded wait for data
    /// - `TooSmall` if `out` cannot hold the message; the read cursor is
    ///   rewound over the header so the message stays in place
    pub fn read(&self, out: &mut [u8]) -> Result<usize, RingError> {
        let mut state = self.state.lock();
        if state.is_empty() {
            counter!("muxd_ring_empty_total").increment(1);
            let result = self.data_ready.wait_for(&mut state, self.wait_timeout);
            trace!(timed_out = result.timed_out(), "ring empty wait finished");
            return Err(RingError::Empty);
        }

        let header_start = state.read;
        let mut header = [0u8; LENGTH_HEADER_LEN];
        state.copy_out(&mut header);
        let len = usize::from_le_bytes(header);

        if out.len() < len {
            state.read = header_start;
            trace!(len, available = out.len(), "output buffer too small");
            return Err(RingError::TooSmall { required: len });
        }

        state.copy_out(&mut out[..len]);
        drop(state);

        self.space_freed.notify_all();
        Ok(len)
    }

    /// Take the oldest message into a freshly allocated vector
    ///
    /// Starts with a `hint`-sized buffer and grows it once on `TooSmall`.
    pub fn read_to_vec(&self, hint: usize) -> Result<Vec<u8>, RingError> {
        let mut buf = vec![0u8; hint];
        let len = match self.read(&mut buf) {
            Err(RingError::TooSmall { required }) => {
                buf.resize(required, 0);
                self.read(&mut buf)?
            }
            other => other?,
        };
        buf.truncate(len);
        Ok(buf)
    }
}
