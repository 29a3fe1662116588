#![allow(dead_code)]

use loadcore::executor::ExecFuture;
use loadcore::prelude::*;
use rand_distr::{Distribution, SkewNormal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Test double for the transport layer: skew-normal latency and optional
/// deterministic failure injection (every Nth call is a transport error).
pub struct MockExecutor {
    mean: Duration,
    std: Duration,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl MockExecutor {
    pub fn with_latency(mean: Duration, std: Duration) -> Self {
        Self {
            mean,
            std,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing_every(mut self, every: u64) -> Self {
        self.fail_every = Some(every);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn delay(&self) -> Duration {
        if self.std.is_zero() {
            return self.mean;
        }
        let normal =
            SkewNormal::new(self.mean.as_secs_f64(), self.std.as_secs_f64(), 20.).unwrap();
        let v: f64 = normal.sample(&mut rand::thread_rng()).max(0.);
        Duration::from_secs_f64(v)
    }
}

impl RequestExecutor for MockExecutor {
    fn execute<'a>(&'a self, _spec: &'a RequestSpec, _timeout: Duration) -> ExecFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.delay()).await;
            if let Some(every) = self.fail_every {
                if n % every == 0 {
                    return Err(TransportError::new("injected failure"));
                }
            }
            Ok(ExecutorResponse {
                status: 200,
                latency: self.mean,
                time_to_first_byte: None,
                body: b"ok".to_vec(),
            })
        })
    }
}

/// Evaluator that rejects every response.
pub struct RejectAll;

impl AssertionEvaluator for RejectAll {
    fn evaluate(&self, _response: &ExecutorResponse) -> Assertion {
        Assertion::Fail("expected value missing".to_string())
    }
}
