//! Process-lifetime query counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{QueryAnswer, Strategy};

/// Monotonic counters plus a running latency total.
///
/// Injected as an `Arc` into the query service; only an explicit operator
/// reset clears it.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    total: AtomicU64,
    successful: AtomicU64,
    remote_uses: AtomicU64,
    fallback_uses: AtomicU64,
    transfers: AtomicU64,
    latency_ms_sum: AtomicU64,
}

/// Point-in-time copy of [`QueryMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub remote_uses: u64,
    pub fallback_uses: u64,
    pub transfers: u64,
    pub average_latency_ms: f64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed query. `degraded` marks a generation failure.
    pub fn record(&self, answer: &QueryAnswer, degraded: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if !degraded {
            self.successful.fetch_add(1, Ordering::Relaxed);
        }
        match answer.strategy {
            Strategy::Remote | Strategy::Hybrid => {
                self.remote_uses.fetch_add(1, Ordering::Relaxed);
            }
            Strategy::Fallback => {
                self.fallback_uses.fetch_add(1, Ordering::Relaxed);
            }
            Strategy::Transfer => {
                self.transfers.fetch_add(1, Ordering::Relaxed);
            }
            Strategy::None => {}
        }
        self.latency_ms_sum
            .fetch_add(millis(answer.duration), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let latency = self.latency_ms_sum.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_queries: total,
            successful_queries: self.successful.load(Ordering::Relaxed),
            remote_uses: self.remote_uses.load(Ordering::Relaxed),
            fallback_uses: self.fallback_uses.load(Ordering::Relaxed),
            transfers: self.transfers.load(Ordering::Relaxed),
            average_latency_ms: if total == 0 {
                0.0
            } else {
                latency as f64 / total as f64
            },
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.successful,
            &self.remote_uses,
            &self.fallback_uses,
            &self.transfers,
            &self.latency_ms_sum,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
