//! Routing header codec
//!
//! Wire layout of one frame inside a ring buffer message:
//!
//! ```text
//! [source_id: u64 LE][destination_id: u64 LE][sequence: u64 LE][payload...]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ContractError, Frame, ROUTING_HEADER_LEN};

/// Stateless frame encoder/decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Serialize `frame` into one contiguous message
    pub fn encode(frame: &Frame) -> Bytes {
        let mut buf = BytesMut::with_capacity(frame.encoded_len());
        buf.put_u64_le(frame.source_id);
        buf.put_u64_le(frame.destination_id);
        buf.put_u64_le(frame.sequence);
        buf.put_slice(&frame.payload);
        buf.freeze()
    }

    /// Parse one message back into a frame
    ///
    /// The payload is everything after the routing header and may be empty.
    pub fn decode(message: &[u8]) -> Result<Frame, ContractError> {
        if message.len() < ROUTING_HEADER_LEN {
            return Err(ContractError::MalformedFrame {
                len: message.len(),
                required: ROUTING_HEADER_LEN,
            });
        }

        let mut header = &message[..ROUTING_HEADER_LEN];
        let source_id = header.get_u64_le();
        let destination_id = header.get_u64_le();
        let sequence = header.get_u64_le();

        Ok(Frame {
            source_id,
            destination_id,
            sequence,
            payload: Bytes::copy_from_slice(&message[ROUTING_HEADER_LEN..]),
        })
    }
}
