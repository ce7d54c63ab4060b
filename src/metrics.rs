//! Metrics collaborator interface and its in-memory implementation.
//!
//! The proxy emits one inbound count per request and, per forwarding
//! attempt, a forwarded count labeled by backend host and outcome plus a
//! latency observation. The sink is an explicit reference handed to the
//! proxy at construction rather than a process-wide singleton, so tests
//! can inspect counters and alternative exporters can be swapped in.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Receiver for proxy observability events.
///
/// Implementations must tolerate unsynchronized concurrent use from
/// arbitrarily many simultaneous dispatches.
pub trait MetricsSink: Send + Sync {
    /// One inbound request was received by the proxy.
    fn inc_inbound(&self);

    /// One forwarding attempt to `host` completed with `outcome`
    /// (one of the [`outcome`] label constants).
    fn inc_forwarded(&self, host: &str, outcome: &str);

    /// Observe the wall-clock duration of one forwarding attempt.
    fn observe_forward_latency(&self, seconds: f64);
}

/// Outcome labels for [`MetricsSink::inc_forwarded`].
pub mod outcome {
    /// Backend completed the exchange with a status below 400.
    pub const OK: &str = "ok";
    /// Backend completed the exchange with a status of 400 or above.
    pub const HTTP_ERROR: &str = "http-error";
    /// The HTTP exchange never completed (connect failure, timeout).
    pub const TRANSPORT_ERROR: &str = "transport-error";
    /// The outbound request could not be constructed.
    pub const BUILD_ERROR: &str = "build-error";
}

/// Counter-based [`MetricsSink`] holding everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inbound: AtomicU64,
    forwarded: Mutex<HashMap<(String, String), u64>>,
    latency_count: AtomicU64,
    latency_sum_micros: AtomicU64,
}

impl InMemoryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn inbound_count(&self) -> u64 {
        self.inbound.load(Ordering::Relaxed)
    }

    /// Forwarded-attempt count for one (host, outcome) pair.
    #[must_use]
    pub fn forwarded_count(&self, host: &str, outcome: &str) -> u64 {
        let counters = self.forwarded.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(&(host.to_string(), outcome.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total forwarded-attempt count across all hosts and outcomes.
    #[must_use]
    pub fn forwarded_total(&self) -> u64 {
        let counters = self.forwarded.lock().unwrap_or_else(|e| e.into_inner());
        counters.values().sum()
    }

    #[must_use]
    pub fn latency_observation_count(&self) -> u64 {
        self.latency_count.load(Ordering::Relaxed)
    }
}

impl MetricsSink for InMemoryMetrics {
    fn inc_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_forwarded(&self, host: &str, outcome: &str) {
        let mut counters = self.forwarded.lock().unwrap_or_else(|e| e.into_inner());
        *counters
            .entry((host.to_string(), outcome.to_string()))
            .or_insert(0) += 1;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn observe_forward_latency(&self, seconds: f64) {
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        // Micro resolution is plenty for network round-trips
        self.latency_sum_micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
    }
}
