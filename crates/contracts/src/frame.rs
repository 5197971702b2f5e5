//! Frame - the unit of payload moving through the ring buffer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Endpoint identifier (port number in the daemon's terms)
pub type EndpointId = u64;

/// Lowest accepted endpoint id
pub const MIN_ENDPOINT_ID: EndpointId = 0;

/// Highest accepted endpoint id (inclusive)
pub const MAX_ENDPOINT_ID: EndpointId = 128;

/// Reserved id that is never a valid source or destination
pub const SENTINEL_ID: EndpointId = 42;

/// Upper bound of one encoded frame (routing header + payload)
pub const MESSAGE_SIZE: usize = 128;

/// Routing header width: source id, destination id, sequence
pub const ROUTING_HEADER_LEN: usize = 3 * std::mem::size_of::<u64>();

/// Largest payload chunk a configuration may ask for
pub const MAX_PAYLOAD: usize = MESSAGE_SIZE - ROUTING_HEADER_LEN;

/// Largest payload chunk a producer reads when not configured otherwise
pub const DEFAULT_MAX_PAYLOAD: usize = MAX_PAYLOAD;

/// Source/destination pair stamped on every frame of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub source_id: EndpointId,
    pub destination_id: EndpointId,
}

impl Route {
    pub fn new(source_id: EndpointId, destination_id: EndpointId) -> Self {
        Self {
            source_id,
            destination_id,
        }
    }

    /// Whether both ids fall inside `[MIN_ENDPOINT_ID, MAX_ENDPOINT_ID]`
    pub fn in_range(&self) -> bool {
        (MIN_ENDPOINT_ID..=MAX_ENDPOINT_ID).contains(&self.source_id)
            && (MIN_ENDPOINT_ID..=MAX_ENDPOINT_ID).contains(&self.destination_id)
    }
}

/// Routed payload chunk
///
/// Immutable once built; `payload` is a cheap-to-clone `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Producing endpoint
    pub source_id: EndpointId,

    /// Consuming endpoint (selects the sink)
    pub destination_id: EndpointId,

    /// Per-producer sequence number, strictly increasing
    pub sequence: u64,

    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    pub fn new(route: Route, sequence: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            source_id: route.source_id,
            destination_id: route.destination_id,
            sequence,
            payload: payload.into(),
        }
    }

    pub fn route(&self) -> Route {
        Route::new(self.source_id, self.destination_id)
    }

    /// Length once encoded with its routing header
    pub fn encoded_len(&self) -> usize {
        ROUTING_HEADER_LEN + self.payload.len()
    }
}
