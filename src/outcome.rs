//! Classification of one completed attempt.

use crate::executor::{Assertion, AssertionEvaluator, ExecutorResponse, TransportError};
use std::time::{Duration, Instant};

/// Total, mutually exclusive label for one attempt. Every dispatched request
/// ends up in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    /// Executor succeeded and the assertion passed.
    Success,
    /// Executor succeeded but the assertion rejected the response.
    AssertionFailure,
    /// The per-request timeout elapsed before a response arrived.
    Timeout,
    /// Failure below the protocol layer.
    TransportError,
    /// The rate controller fell behind its schedule; synthesized, never
    /// actually executed.
    Overload,
}

impl OutcomeKind {
    pub(crate) const ALL: [OutcomeKind; 5] = [
        OutcomeKind::Success,
        OutcomeKind::AssertionFailure,
        OutcomeKind::Timeout,
        OutcomeKind::TransportError,
        OutcomeKind::Overload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AssertionFailure => "assertion_failure",
            Self::Timeout => "timeout",
            Self::TransportError => "transport_error",
            Self::Overload => "overload",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether a request was actually executed and its latency measured.
    /// Overload outcomes are bookkeeping only.
    pub(crate) fn has_latency(&self) -> bool {
        !matches!(self, Self::Overload)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt's record, produced once per dispatch and consumed exactly
/// once by the aggregator.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency: Duration,
    pub kind: OutcomeKind,
    pub detail: Option<String>,
}

impl RequestOutcome {
    pub(crate) fn overload(now: Instant) -> Self {
        Self {
            started_at: now,
            finished_at: now,
            latency: Duration::ZERO,
            kind: OutcomeKind::Overload,
            detail: None,
        }
    }

    /// Charged to an attempt still pending when the pool drains.
    /// `started_at` is the attempt's actual dispatch time; latency is the
    /// enforced bound, not a measurement.
    pub(crate) fn drain_timeout(started_at: Instant, timeout: Duration) -> Self {
        Self {
            started_at,
            finished_at: started_at + timeout,
            latency: timeout,
            kind: OutcomeKind::Timeout,
            detail: Some("request still pending at drain".to_string()),
        }
    }
}

/// Maps one attempt onto exactly one [`OutcomeKind`].
///
/// `result` is the executor call wrapped in the engine's own timeout:
/// `None` means the deadline elapsed. The assertion layer only runs when
/// the executor produced a response.
pub(crate) fn classify(
    started_at: Instant,
    result: Option<Result<ExecutorResponse, TransportError>>,
    timeout: Duration,
    evaluator: &dyn AssertionEvaluator,
) -> RequestOutcome {
    let finished_at = Instant::now();
    match result {
        Some(Ok(response)) => {
            let latency = finished_at.duration_since(started_at);
            match evaluator.evaluate(&response) {
                Assertion::Pass => RequestOutcome {
                    started_at,
                    finished_at,
                    latency,
                    kind: OutcomeKind::Success,
                    detail: None,
                },
                Assertion::Fail(reason) => RequestOutcome {
                    started_at,
                    finished_at,
                    latency,
                    kind: OutcomeKind::AssertionFailure,
                    detail: Some(reason),
                },
            }
        }
        Some(Err(err)) => RequestOutcome {
            started_at,
            finished_at,
            latency: finished_at.duration_since(started_at),
            kind: OutcomeKind::TransportError,
            detail: Some(err.detail),
        },
        None => RequestOutcome {
            started_at,
            finished_at,
            latency: timeout,
            kind: OutcomeKind::Timeout,
            detail: None,
        },
    }
}
