//! Dispatch metrics shared by all workers of a pool

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::EndpointId;

use crate::filter::RejectReason;

/// Pool-wide counters
///
/// The per-destination map is fixed at construction; only the counters
/// inside it change.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    frames_read: AtomicU64,
    accepted: AtomicU64,
    rejected_self_route: AtomicU64,
    rejected_sentinel_id: AtomicU64,
    rejected_sentinel_sum: AtomicU64,
    rejected_blocked_marker: AtomicU64,
    malformed: AtomicU64,
    unroutable: AtomicU64,
    sink_failures: AtomicU64,
    bytes_by_destination: HashMap<EndpointId, AtomicU64>,
}

impl DispatchMetrics {
    pub fn new(destinations: impl IntoIterator<Item = EndpointId>) -> Self {
        Self {
            bytes_by_destination: destinations
                .into_iter()
                .map(|d| (d, AtomicU64::new(0)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn record_read(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, reason: RejectReason) {
        self.rejected_counter(reason).fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unroutable(&self) {
        self.unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, destination: EndpointId, len: usize) {
        if let Some(counter) = self.bytes_by_destination.get(&destination) {
            counter.fetch_add(len as u64, Ordering::Relaxed);
        }
    }

    fn rejected_counter(&self, reason: RejectReason) -> &AtomicU64 {
        match reason {
            RejectReason::SelfRoute => &self.rejected_self_route,
            RejectReason::SentinelId => &self.rejected_sentinel_id,
            RejectReason::SentinelSum => &self.rejected_sentinel_sum,
            RejectReason::BlockedMarker => &self.rejected_blocked_marker,
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: RejectReason::ALL
                .into_iter()
                .map(|r| (r, self.rejected_counter(r).load(Ordering::Relaxed)))
                .collect(),
            malformed: self.malformed.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            bytes_by_destination: self
                .bytes_by_destination
                .iter()
                .map(|(d, c)| (*d, c.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub frames_read: u64,
    pub accepted: u64,
    pub rejected: BTreeMap<RejectReason, u64>,
    pub malformed: u64,
    pub unroutable: u64,
    pub sink_failures: u64,
    pub bytes_by_destination: BTreeMap<EndpointId, u64>,
}

impl DispatchSnapshot {
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }

    pub fn rejected_for(&self, reason: RejectReason) -> u64 {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = DispatchMetrics::new([11, 13]);
        metrics.record_read();
        metrics.record_read();
        metrics.record_read();
        metrics.record_accepted();
        metrics.record_bytes(11, 20);
        metrics.record_bytes(99, 5);
        metrics.record_rejected(RejectReason::BlockedMarker);
        metrics.record_rejected(RejectReason::SelfRoute);

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_read, 3);
        assert_eq!(snap.accepted, 1);
        assert_eq!(snap.rejected_total(), 2);
        assert_eq!(snap.rejected_for(RejectReason::BlockedMarker), 1);
        assert_eq!(snap.rejected_for(RejectReason::SentinelSum), 0);
        assert_eq!(snap.bytes_by_destination[&11], 20);
        assert_eq!(snap.bytes_by_destination[&13], 0);
        assert!(!snap.bytes_by_destination.contains_key(&99));
    }
}
