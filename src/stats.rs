//! `SyncStats` — per-peer gossip counters and latency histograms. See
//! `spec.md` §2 and §4.7 steps 7–10.
//!
//! Grounded on the bucketed `Histogram` in the teacher's
//! `monitoring::metrics` module, scaled down to the fixed millisecond
//! buckets this crate's two reward thresholds (5ms, 100ms) care about.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const BUCKET_BOUNDS_MS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, f64::INFINITY];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub upper_bound_ms: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyHistogram {
    buckets: Vec<HistogramBucket>,
    sum_ms: f64,
    count: u64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            buckets: BUCKET_BOUNDS_MS
                .iter()
                .map(|&upper_bound_ms| HistogramBucket { upper_bound_ms, count: 0 })
                .collect(),
            sum_ms: 0.0,
            count: 0,
        }
    }

    pub fn observe(&mut self, latency: Duration) {
        let ms = latency.as_secs_f64() * 1000.0;
        self.sum_ms += ms;
        self.count += 1;
        for bucket in self.buckets.iter_mut() {
            if ms <= bucket.upper_bound_ms {
                bucket.count += 1;
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms / self.count as f64
        }
    }

    pub fn buckets(&self) -> &[HistogramBucket] {
        &self.buckets
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters and latency histograms for gossip exchanges with one peer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerStats {
    pub syncs: u64,
    pub pulls: u64,
    pub pushes: u64,
    pub misses: u64,
    pub versions: u64,
    #[serde(default)]
    pub pull_latency: LatencyHistogram,
    #[serde(default)]
    pub push_latency: LatencyHistogram,
}

/// Per-peer counters, touched only by the anti-entropy task in the steady
/// state. The `Replica` wraps this in a `parking_lot::Mutex` purely for the
/// shutdown path, which reads a final snapshot from a different task —
/// contention is otherwise zero, matching "no lock required" in spirit even
/// though Rust's aliasing rules require *a* synchronization primitive to
/// share it across task boundaries at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    per_peer: HashMap<String, PeerStats>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer_mut(&mut self, peer: &str) -> &mut PeerStats {
        self.per_peer.entry(peer.to_string()).or_default()
    }

    pub fn peer(&self, peer: &str) -> Option<&PeerStats> {
        self.per_peer.get(peer)
    }

    pub fn snapshot(&self) -> HashMap<String, PeerStats> {
        self.per_peer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_are_cumulative_by_bucket() {
        let mut h = LatencyHistogram::new();
        h.observe(Duration::from_millis(3));
        h.observe(Duration::from_millis(60));

        let buckets = h.buckets();
        let at_or_above = |bound: f64| buckets.iter().find(|b| b.upper_bound_ms == bound).unwrap().count;

        assert_eq!(at_or_above(1.0), 0);
        assert_eq!(at_or_above(5.0), 1);
        assert_eq!(at_or_above(100.0), 2);
        assert_eq!(h.count(), 2);
    }

    #[test]
    fn peer_stats_are_created_on_first_access() {
        let mut stats = SyncStats::new();
        stats.peer_mut("10.0.0.1:3264").misses += 1;
        assert_eq!(stats.peer("10.0.0.1:3264").unwrap().misses, 1);
        assert!(stats.peer("unknown").is_none());
    }
}
