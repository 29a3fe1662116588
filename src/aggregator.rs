//! Thread-safe accumulation of outcomes into counters and the histogram.
//!
//! The write path is the highest-contention point in the engine (once per
//! completed request from every worker) and is entirely relaxed atomics: no
//! locks, no I/O, no allocation.

use crate::histogram::LatencyHistogram;
use crate::outcome::{OutcomeKind, RequestOutcome};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub(crate) struct Aggregator {
    dispatched: AtomicU64,
    by_kind: [AtomicU64; OutcomeKind::ALL.len()],
    measured: AtomicU64,
    sum_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
    histogram: LatencyHistogram,
}

/// A consistent read of the aggregator. Exact once the pool is drained;
/// during a run it may trail in-flight increments by a few outcomes.
#[derive(Debug, Clone)]
pub(crate) struct AggregateSnapshot {
    pub total: u64,
    pub successful: u64,
    pub failed_by_kind: BTreeMap<OutcomeKind, u64>,
    pub error_rate: f64,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            by_kind: Default::default(),
            measured: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
            histogram: LatencyHistogram::new(),
        }
    }

    /// Notes that a worker is about to issue a request. After a full drain,
    /// `dispatched() == snapshot().total`.
    pub fn note_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Records one outcome. Safe under concurrent calls from all workers.
    pub fn record(&self, outcome: &RequestOutcome) {
        let kind_idx = OutcomeKind::ALL
            .iter()
            .position(|k| *k == outcome.kind)
            .unwrap_or(0);
        self.by_kind[kind_idx].fetch_add(1, Ordering::Relaxed);

        if outcome.kind.has_latency() {
            let nanos = u64::try_from(outcome.latency.as_nanos()).unwrap_or(u64::MAX);
            self.measured.fetch_add(1, Ordering::Relaxed);
            self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
            self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
            self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
            self.histogram.record(outcome.latency);
        }
    }

    pub fn total(&self) -> u64 {
        self.by_kind
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Failed / total, defined as 0 when nothing has completed yet.
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.;
        }
        let success = self.by_kind[0].load(Ordering::Relaxed);
        (total - success) as f64 / total as f64
    }

    /// Folds the counters and histogram into a consistent summary without
    /// pausing concurrent recording.
    pub fn snapshot(&self) -> AggregateSnapshot {
        let counts: Vec<u64> = self
            .by_kind
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        let total: u64 = counts.iter().sum();
        let successful = counts[0];

        let mut failed_by_kind = BTreeMap::new();
        for (kind, count) in OutcomeKind::ALL.iter().zip(counts.iter()) {
            if !kind.is_success() && *count > 0 {
                failed_by_kind.insert(*kind, *count);
            }
        }

        let measured = self.measured.load(Ordering::Relaxed);
        let min_nanos = self.min_nanos.load(Ordering::Relaxed);
        let min = if measured == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(min_nanos)
        };
        let max = Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed));
        let avg = if measured == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.sum_nanos.load(Ordering::Relaxed) / measured)
        };

        // Quantile estimates are bucket midpoints; clamping to the observed
        // extremes keeps p50 <= p90 <= p95 <= p99 <= max exact.
        let quantile = |q: f64| {
            self.histogram
                .quantile(q)
                .map(|d| d.clamp(min, max))
                .unwrap_or(Duration::ZERO)
        };

        AggregateSnapshot {
            total,
            successful,
            failed_by_kind,
            error_rate: if total == 0 {
                0.
            } else {
                (total - successful) as f64 / total as f64
            },
            min,
            max,
            avg,
            p50: quantile(0.50),
            p90: quantile(0.90),
            p95: quantile(0.95),
            p99: quantile(0.99),
        }
    }
}
