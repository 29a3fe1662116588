//! Worker pool of virtual users.
//!
//! Each worker is a tokio task looping: observe the stop signal, wait for a
//! rate permit when the profile is rate-driven, dispatch one request through
//! the executor under the per-request timeout, classify, hand the outcome to
//! the aggregator, and immediately go again. Backpressure comes from the
//! target's own latency; there is no think-time.

use crate::aggregator::Aggregator;
use crate::controllers::RateController;
use crate::executor::{AssertionEvaluator, RequestExecutor, RequestSpec};
use crate::outcome::{classify, RequestOutcome};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

const IDLE: u8 = 0;
const EXECUTING: u8 = 1;
const STOPPED: u8 = 2;

/// Everything a worker needs, shared across the pool.
pub(crate) struct WorkerContext {
    pub executor: Arc<dyn RequestExecutor>,
    pub evaluator: Arc<dyn AssertionEvaluator>,
    pub request: RequestSpec,
    pub timeout: Duration,
    pub aggregator: Arc<Aggregator>,
    pub rate: Option<Arc<RateController>>,
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    // Dispatch time of the in-flight attempt, as nanos past the pool epoch.
    // Written before the state flips to EXECUTING.
    started_nanos: Arc<AtomicU64>,
}

/// Owns exactly N live worker loops, N set by the active profile or the
/// ramp schedule.
pub(crate) struct ConcurrencyPool {
    ctx: Arc<WorkerContext>,
    workers: Vec<Worker>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    live: Arc<AtomicUsize>,
    epoch: Instant,
}

impl ConcurrencyPool {
    pub fn new(ctx: WorkerContext) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            ctx: Arc::new(ctx),
            workers: vec![],
            stop_tx,
            stop_rx,
            live: Arc::new(AtomicUsize::new(0)),
            epoch: Instant::now(),
        }
    }

    /// Gauge of currently live workers, readable from outside the pool.
    pub fn live_gauge(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Brings the pool to `target` workers. Scale-up spawns immediately;
    /// scale-down signals the excess workers and waits for each to finish
    /// its in-flight request. Never interrupts mid-request.
    pub async fn resize(&mut self, target: usize) {
        if target == self.workers.len() {
            return;
        }
        debug!("Resizing pool: {} -> {}", self.workers.len(), target);

        if target > self.workers.len() {
            while self.workers.len() < target {
                self.spawn_worker();
            }
        } else {
            let removed = self.workers.split_off(target);
            for worker in &removed {
                worker.stop.store(true, Ordering::Relaxed);
            }
            for worker in removed {
                let _ = worker.handle.await;
            }
        }
    }

    fn spawn_worker(&mut self) {
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(IDLE));
        let started_nanos = Arc::new(AtomicU64::new(0));
        self.live.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(worker_loop(
            Arc::clone(&self.ctx),
            self.stop_rx.clone(),
            Arc::clone(&stop),
            Arc::clone(&state),
            Arc::clone(&started_nanos),
            self.epoch,
            Arc::clone(&self.live),
        ));
        self.workers.push(Worker {
            handle,
            stop,
            state,
            started_nanos,
        });
    }

    /// Broadcasts the stop signal without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stops every worker and waits for in-flight requests to finish,
    /// bounded by the per-request timeout. A worker still executing at the
    /// bound is aborted and its pending attempt recorded as a timeout, so
    /// recorded and dispatched counts stay balanced.
    pub async fn drain(&mut self, timeout: Duration) {
        self.signal_stop();

        let deadline =
            tokio::time::Instant::now() + timeout + crate::constants::CONTROL_INTERVAL;
        for mut worker in self.workers.drain(..) {
            worker.stop.store(true, Ordering::Relaxed);
            match tokio::time::timeout_at(deadline, &mut worker.handle).await {
                Ok(_) => {}
                Err(_) => {
                    // Whichever side flips the state out of EXECUTING owns
                    // recording the in-flight attempt. Losing means the
                    // worker finished between the deadline and the abort and
                    // recorded (and decremented the gauge) on its own.
                    let owns = worker
                        .state
                        .compare_exchange(
                            EXECUTING,
                            STOPPED,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok();
                    worker.handle.abort();
                    if owns {
                        warn!("Worker still executing at drain bound; reporting as timeout");
                        let _ = self.live.fetch_update(
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                            |v| Some(v.saturating_sub(1)),
                        );
                        let started_at = self.epoch
                            + Duration::from_nanos(worker.started_nanos.load(Ordering::Relaxed));
                        self.ctx
                            .aggregator
                            .record(&RequestOutcome::drain_timeout(started_at, timeout));
                    }
                }
            }
        }
    }
}

async fn worker_loop(
    ctx: Arc<WorkerContext>,
    mut stop_rx: watch::Receiver<bool>,
    own_stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    started_nanos: Arc<AtomicU64>,
    epoch: Instant,
    live: Arc<AtomicUsize>,
) {
    loop {
        if *stop_rx.borrow() || own_stop.load(Ordering::Relaxed) {
            break;
        }

        if let Some(rate) = &ctx.rate {
            // Wait for the schedule, racing the stop broadcast so a stopped
            // run is not held up by a slow rate.
            tokio::select! {
                _ = rate.acquire() => {}
                res = stop_rx.changed() => {
                    if res.is_err() || *stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if own_stop.load(Ordering::Relaxed) {
                break;
            }
        }

        ctx.aggregator.note_dispatch();
        let started_at = Instant::now();
        started_nanos.store(
            started_at.duration_since(epoch).as_nanos() as u64,
            Ordering::Relaxed,
        );
        state.store(EXECUTING, Ordering::Release);
        let result = tokio::time::timeout(
            ctx.timeout,
            ctx.executor.execute(&ctx.request, ctx.timeout),
        )
        .await
        .ok();
        let outcome = classify(started_at, result, ctx.timeout, ctx.evaluator.as_ref());
        // Whichever side flips the state out of EXECUTING owns recording
        // this attempt; losing to the drainer means it was already reported
        // as a drain timeout and the gauge decrement is the drainer's too.
        if state
            .compare_exchange(EXECUTING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        trace!("Outcome: {} in {:?}", outcome.kind, outcome.latency);
        ctx.aggregator.record(&outcome);
        emit_metrics(&ctx.request, &outcome);
    }

    state.store(STOPPED, Ordering::Relaxed);
    live.fetch_sub(1, Ordering::Relaxed);
}

#[cfg(feature = "metrics")]
fn emit_metrics(request: &RequestSpec, outcome: &RequestOutcome) {
    metrics::counter!(
        "loadcore_requests_total",
        "request" => request.name.clone(),
        "outcome" => outcome.kind.as_str()
    )
    .increment(1);
    if outcome.kind.has_latency() {
        metrics::histogram!(
            "loadcore_latency_seconds",
            "request" => request.name.clone()
        )
        .record(outcome.latency.as_secs_f64());
    }
}

#[cfg(not(feature = "metrics"))]
fn emit_metrics(_request: &RequestSpec, _outcome: &RequestOutcome) {}
