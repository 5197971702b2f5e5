//! Frame validation policy

use std::fmt;

use contracts::{Frame, SENTINEL_ID};

/// Marker whose letters, in order, must not appear anywhere in a payload
pub const BLOCKED_MARKER: &[u8] = b"malicious";

/// Why a frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    /// Source and destination are the same endpoint
    SelfRoute,
    /// Source or destination is the sentinel id
    SentinelId,
    /// Source and destination add up to the sentinel id
    SentinelSum,
    /// Payload contains the blocked marker as a subsequence
    BlockedMarker,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        Self::SelfRoute,
        Self::SentinelId,
        Self::SentinelSum,
        Self::BlockedMarker,
    ];

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfRoute => "self_route",
            Self::SentinelId => "sentinel_id",
            Self::SentinelSum => "sentinel_sum",
            Self::BlockedMarker => "blocked_marker",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless frame filter
#[derive(Debug, Clone)]
pub struct FrameFilter {
    marker: Vec<u8>,
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::with_marker(BLOCKED_MARKER)
    }
}

impl FrameFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with a different blocked marker; an empty marker blocks nothing
    pub fn with_marker(marker: impl Into<Vec<u8>>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Check routing ids first, then scan the payload
    pub fn validate(&self, frame: &Frame) -> Result<(), RejectReason> {
        let (from, to) = (frame.source_id, frame.destination_id);

        if from == to {
            return Err(RejectReason::SelfRoute);
        }
        if from == SENTINEL_ID || to == SENTINEL_ID {
            return Err(RejectReason::SentinelId);
        }
        if from.checked_add(to) == Some(SENTINEL_ID) {
            return Err(RejectReason::SentinelSum);
        }
        if contains_subsequence(&frame.payload, &self.marker) {
            return Err(RejectReason::BlockedMarker);
        }
        Ok(())
    }
}

/// Whether `needle` occurs in `haystack` in order, gaps allowed
///
/// An empty needle never matches.
pub fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut pending = needle.iter().peekable();
    for byte in haystack {
        if pending.peek() == Some(&byte) {
            pending.next();
            if pending.peek().is_none() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Route;

    fn frame(from: u64, to: u64, payload: &'static [u8]) -> Frame {
        Frame::new(Route::new(from, to), 0, payload)
    }

    #[test]
    fn test_accepts_plain_frame() {
        let filter = FrameFilter::new();
        assert_eq!(filter.validate(&frame(1, 11, b"hello there")), Ok(()));
    }

    #[test]
    fn test_routing_rules() {
        let filter = FrameFilter::new();
        assert_eq!(
            filter.validate(&frame(5, 5, b"x")),
            Err(RejectReason::SelfRoute)
        );
        assert_eq!(
            filter.validate(&frame(42, 1, b"x")),
            Err(RejectReason::SentinelId)
        );
        assert_eq!(
            filter.validate(&frame(1, 42, b"x")),
            Err(RejectReason::SentinelId)
        );
        assert_eq!(
            filter.validate(&frame(20, 22, b"x")),
            Err(RejectReason::SentinelSum)
        );
        assert_eq!(filter.validate(&frame(20, 23, b"x")), Ok(()));
    }

    #[test]
    fn test_self_route_checked_before_sum() {
        // 21 + 21 is also the sentinel sum
        let filter = FrameFilter::new();
        assert_eq!(
            filter.validate(&frame(21, 21, b"x")),
            Err(RejectReason::SelfRoute)
        );
    }

    #[test]
    fn test_huge_ids_do_not_overflow() {
        let filter = FrameFilter::new();
        assert_eq!(filter.validate(&frame(u64::MAX, 43, b"x")), Ok(()));
    }

    #[test]
    fn test_marker_as_loose_subsequence() {
        let filter = FrameFilter::new();
        assert_eq!(
            filter.validate(&frame(1, 11, b"this is malicious")),
            Err(RejectReason::BlockedMarker)
        );
        assert_eq!(
            filter.validate(&frame(1, 11, b"m_a_l_i_c_i_o_u_s")),
            Err(RejectReason::BlockedMarker)
        );
        assert_eq!(
            filter.validate(&frame(1, 11, b"my animal licks ice on our shoes")),
            Err(RejectReason::BlockedMarker)
        );
        // letters present but out of order
        assert_eq!(filter.validate(&frame(1, 11, b"suoicilam")), Ok(()));
        assert_eq!(filter.validate(&frame(1, 11, b"maliciou")), Ok(()));
    }

    #[test]
    fn test_contains_subsequence_edges() {
        assert!(contains_subsequence(b"abc", b"abc"));
        assert!(contains_subsequence(b"xaxbxc", b"abc"));
        assert!(!contains_subsequence(b"", b"a"));
        assert!(!contains_subsequence(b"anything", b""));
        assert!(!contains_subsequence(b"aab", b"aba"));
    }

    #[test]
    fn test_custom_marker() {
        let filter = FrameFilter::with_marker("bad");
        assert_eq!(
            filter.validate(&frame(1, 11, b"b-a-d")),
            Err(RejectReason::BlockedMarker)
        );
        assert_eq!(filter.validate(&frame(1, 11, b"malicious")), Ok(()));
    }
}
