//! Top-level orchestration: profile selection, watchdog, lifecycle, drain.

use crate::aggregator::Aggregator;
use crate::constants::{
    CONTROL_INTERVAL, MAX_RATE_WORKERS, MAX_WORKER_STEP, MIN_THRESHOLD_SAMPLE,
};
use crate::controllers::{RampController, RampState, RateController};
use crate::error::Error;
use crate::executor::{AssertionEvaluator, RequestExecutor, RequestSpec};
use crate::handle::RunHandle;
use crate::pool::{ConcurrencyPool, WorkerContext};
use crate::profile::LoadProfile;
use crate::result::{RunResult, RunStatus};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Everything one run needs. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub profile: LoadProfile,
    pub request: RequestSpec,
    pub per_request_timeout: Duration,
    /// Error-rate fraction in (0, 1]; breaching it aborts the run early.
    pub error_threshold: Option<f64>,
}

impl RunPlan {
    pub fn new(profile: LoadProfile, request: RequestSpec, per_request_timeout: Duration) -> Self {
        Self {
            profile,
            request,
            per_request_timeout,
            error_threshold: None,
        }
    }

    pub fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }
}

/// Orchestrates one run: validates the plan, wires controllers to the pool,
/// supervises the watchdog, and produces the final [`RunResult`].
///
/// One coordinator drives at most one run; a second `start_run` fails with
/// [`Error::InvalidState`].
pub struct RunCoordinator {
    executor: Arc<dyn RequestExecutor>,
    evaluator: Arc<dyn AssertionEvaluator>,
    started: AtomicBool,
}

impl RunCoordinator {
    pub fn new(executor: Arc<dyn RequestExecutor>, evaluator: Arc<dyn AssertionEvaluator>) -> Self {
        Self {
            executor,
            evaluator,
            started: AtomicBool::new(false),
        }
    }

    /// Validates the plan and launches the run. All configuration errors
    /// surface here, synchronously, before any request is dispatched.
    ///
    /// Must be called from within a tokio runtime; the run itself proceeds
    /// on spawned tasks and is observed through the returned [`RunHandle`].
    pub fn start_run(&self, plan: RunPlan) -> Result<RunHandle, Error> {
        plan.profile.validate()?;
        if plan.per_request_timeout.is_zero() {
            return Err(Error::config("per-request timeout must be greater than zero"));
        }
        if let Some(threshold) = plan.error_threshold {
            if !(threshold > 0. && threshold <= 1.) {
                return Err(Error::config("error threshold must be within (0, 1]"));
            }
        }
        self.executor
            .preflight(&plan.request)
            .map_err(|e| Error::config(format!("executor cannot dispatch: {}", e.detail)))?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidState("coordinator already ran"));
        }

        let (result_tx, result_rx) = watch::channel(None);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let rate = plan
            .profile
            .rate()
            .and_then(NonZeroU32::new)
            .map(|r| Arc::new(RateController::new(r)));
        let aggregator = Arc::new(Aggregator::new());
        let pool = ConcurrencyPool::new(WorkerContext {
            executor: Arc::clone(&self.executor),
            evaluator: Arc::clone(&self.evaluator),
            request: plan.request.clone(),
            timeout: plan.per_request_timeout,
            aggregator: Arc::clone(&aggregator),
            rate: rate.clone(),
        });
        let live = pool.live_gauge();

        tokio::spawn(run_driver(
            plan, pool, aggregator, rate, cancel_rx, result_tx,
        ));
        Ok(RunHandle::new(result_rx, cancel_tx, live))
    }
}

#[instrument(name = "run", skip_all, fields(profile = plan.profile.kind()))]
async fn run_driver(
    plan: RunPlan,
    mut pool: ConcurrencyPool,
    aggregator: Arc<Aggregator>,
    rate: Option<Arc<RateController>>,
    cancel_rx: watch::Receiver<bool>,
    result_tx: watch::Sender<Option<RunResult>>,
) {
    info!("Starting run with profile {:?}", plan.profile);
    let started = Instant::now();
    let total_duration = plan.profile.total_duration();
    let ramp = match &plan.profile {
        LoadProfile::RampUp {
            start_users,
            target_users,
            ramp_duration,
            hold_duration,
        } => Some(RampController::new(
            *start_users,
            *target_users,
            *ramp_duration,
            *hold_duration,
        )),
        _ => None,
    };

    pool.resize(plan.profile.initial_users()).await;

    let mut interval = tokio::time::interval(CONTROL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // NOTE: First tick completes instantly
    interval.tick().await;

    // The watchdog: duration expiry, cancellation, ramp schedule, overload
    // accounting, and the error threshold all run on this tick, off the
    // workers' hot path.
    let status = loop {
        interval.tick().await;
        let elapsed = started.elapsed();

        if *cancel_rx.borrow() {
            info!("Cancellation requested; stopping");
            break RunStatus::Cancelled;
        }

        if elapsed >= total_duration {
            break RunStatus::Completed;
        }

        if let Some(ramp) = &ramp {
            if ramp.state_at(elapsed) != RampState::Stopped {
                pool.resize(ramp.users_at(elapsed)).await;
            }
        }

        if let Some(rate) = &rate {
            widen_on_deficit(rate, &aggregator, &mut pool).await;
            rate.drain_overload(&aggregator);
        }

        if let Some(threshold) = plan.error_threshold {
            let total = aggregator.total();
            let error_rate = aggregator.error_rate();
            if total >= MIN_THRESHOLD_SAMPLE && error_rate >= threshold {
                warn!(
                    "Error rate {:.2}% breached the {:.2}% threshold after {} requests; aborting",
                    error_rate * 100.,
                    threshold * 100.,
                    total
                );
                break RunStatus::ThresholdAborted;
            }
        }
    };

    // Account for the schedule up to the stop decision, then let in-flight
    // work finish. Draining after this point must not accrue overload.
    if let Some(rate) = &rate {
        rate.drain_overload(&aggregator);
    }
    pool.drain(plan.per_request_timeout).await;

    let result = RunResult::new(aggregator.snapshot(), started.elapsed(), status);
    info!("{result}");
    let _ = result_tx.send(Some(result));
}

/// Rate-driven profiles start small and widen when dispatch falls behind
/// the schedule, so the pool ends up sized to the target's latency rather
/// than guessed up front.
async fn widen_on_deficit(
    rate: &RateController,
    aggregator: &Aggregator,
    pool: &mut ConcurrencyPool,
) {
    let deficit = rate.deficit(aggregator.dispatched());
    let slack = (rate.rate() as u64 / 10).max(2);
    if deficit <= slack {
        return;
    }

    let current = pool.worker_count();
    if current >= MAX_RATE_WORKERS {
        return;
    }
    let target = (current * 2)
        .min(current + MAX_WORKER_STEP)
        .min(MAX_RATE_WORKERS);
    debug!(
        "Dispatch deficit {} at {} workers; widening to {}",
        deficit, current, target
    );
    pool.resize(target).await;
}
