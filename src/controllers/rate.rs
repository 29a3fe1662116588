use crate::aggregator::Aggregator;
use crate::outcome::RequestOutcome;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Target dispatch schedule for the Tps/Qps profiles.
///
/// Workers `acquire` a permit before every dispatch; the quota is `rate` per
/// second with a burst of 1, so the number of permits granted by elapsed
/// time `t` tracks `floor(rate * t)` within one permit. When the executor
/// cannot keep pace, the schedule deficit beyond one second's worth of work
/// is drained as `Overload` outcomes rather than silently dropped.
pub(crate) struct RateController {
    limiter: DefaultDirectRateLimiter,
    rate: NonZeroU32,
    backlog: u64,
    started: Instant,
}

impl RateController {
    pub fn new(rate: NonZeroU32) -> Self {
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::new(1).unwrap());
        Self {
            limiter: RateLimiter::direct(quota),
            rate,
            backlog: rate.get() as u64,
            started: Instant::now(),
        }
    }

    /// Waits until the schedule permits the next dispatch.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Requests that should have been dispatched by now.
    pub fn expected(&self) -> u64 {
        self.expected_at(self.started.elapsed())
    }

    pub fn expected_at(&self, elapsed: Duration) -> u64 {
        (self.rate.get() as f64 * elapsed.as_secs_f64()).floor() as u64
    }

    /// Dispatch deficit against the schedule, before the backlog allowance.
    pub fn deficit(&self, dispatched: u64) -> u64 {
        self.expected().saturating_sub(dispatched)
    }

    /// Converts any deficit beyond the bounded backlog into `Overload`
    /// outcomes, crediting them as dispatched so drained totals balance.
    /// Returns the number of outcomes synthesized.
    pub fn drain_overload(&self, aggregator: &Aggregator) -> u64 {
        self.drain_overload_at(self.started.elapsed(), aggregator)
    }

    fn drain_overload_at(&self, elapsed: Duration, aggregator: &Aggregator) -> u64 {
        let lag = self
            .expected_at(elapsed)
            .saturating_sub(aggregator.dispatched());
        if lag <= self.backlog {
            return 0;
        }

        let overflow = lag - self.backlog;
        let now = Instant::now();
        for _ in 0..overflow {
            aggregator.note_dispatch();
            aggregator.record(&RequestOutcome::overload(now));
        }
        warn!(
            "Dispatch falling behind target rate: {} attempts beyond the {}-request backlog reported as overload",
            overflow, self.backlog
        );
        overflow
    }
}
