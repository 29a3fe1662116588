//! The final aggregate of a run.

use crate::aggregator::AggregateSnapshot;
use crate::outcome::OutcomeKind;
use std::collections::BTreeMap;
use std::time::Duration;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The configured duration elapsed.
    Completed,
    /// The error threshold was breached; the result is a valid partial
    /// aggregate of everything recorded up to the abort.
    ThresholdAborted,
    /// The caller requested a graceful early stop.
    Cancelled,
}

/// Latency distribution summary. Quantiles are histogram estimates (see
/// [`LatencyHistogram`](crate::histogram::LatencyHistogram) for the error
/// bound); min/max/avg are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
}

/// Summary of one completed or aborted run. Created once at completion and
/// read-only after; `total_requests` always equals `successful` plus the sum
/// of `failed_by_kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub status: RunStatus,
    pub total_requests: u64,
    pub successful: u64,
    pub failed_by_kind: BTreeMap<OutcomeKind, u64>,
    pub latency: LatencySummary,
    /// Completed requests per second over the wall-clock duration.
    pub throughput: f64,
    pub wall_clock: Duration,
    /// Failed / total, 0 when no requests completed.
    pub error_rate: f64,
}

impl RunResult {
    pub(crate) fn new(
        snapshot: AggregateSnapshot,
        wall_clock: Duration,
        status: RunStatus,
    ) -> Self {
        let throughput = if wall_clock.is_zero() {
            0.
        } else {
            snapshot.total as f64 / wall_clock.as_secs_f64()
        };
        Self {
            status,
            total_requests: snapshot.total,
            successful: snapshot.successful,
            failed_by_kind: snapshot.failed_by_kind,
            latency: LatencySummary {
                p50: snapshot.p50,
                p90: snapshot.p90,
                p95: snapshot.p95,
                p99: snapshot.p99,
                min: snapshot.min,
                max: snapshot.max,
                avg: snapshot.avg,
            },
            throughput,
            wall_clock,
            error_rate: snapshot.error_rate,
        }
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_by_kind.values().sum()
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            RunStatus::Completed => "completed",
            RunStatus::ThresholdAborted => "aborted on error threshold",
            RunStatus::Cancelled => "cancelled",
        };
        writeln!(
            f,
            "Run {} after {}: {} requests, {} ok, error rate {:.2}%",
            status,
            humantime::format_duration(Duration::from_millis(self.wall_clock.as_millis() as u64)),
            self.total_requests,
            self.successful,
            self.error_rate * 100.,
        )?;
        write!(
            f,
            "Throughput={:.2}/s, p50={:?}, p90={:?}, p95={:?}, p99={:?}, min={:?}, max={:?}, avg={:?}",
            self.throughput,
            self.latency.p50,
            self.latency.p90,
            self.latency.p95,
            self.latency.p99,
            self.latency.min,
            self.latency.max,
            self.latency.avg,
        )?;
        for (kind, count) in &self.failed_by_kind {
            write!(f, "\n  {kind}: {count}")?;
        }
        Ok(())
    }
}
