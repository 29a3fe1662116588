//! Handle to an in-flight run.

use crate::result::RunResult;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;

/// Handle returned by [`RunCoordinator::start_run`](crate::coordinator::RunCoordinator::start_run).
///
/// The run proceeds on its own; the handle observes it. Awaiting the handle
/// itself or calling [`wait_for_result`](Self::wait_for_result) blocks until
/// the run completes or aborts, and always yields a fully populated
/// [`RunResult`]. Waiting is repeatable and returns the same value each time.
#[pin_project::pin_project]
pub struct RunHandle {
    result_rx: watch::Receiver<Option<RunResult>>,
    cancel_tx: watch::Sender<bool>,
    live: Arc<AtomicUsize>,
    fut: Option<Pin<Box<dyn Future<Output = RunResult> + Send>>>,
}

impl RunHandle {
    pub(crate) fn new(
        result_rx: watch::Receiver<Option<RunResult>>,
        cancel_tx: watch::Sender<bool>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            result_rx,
            cancel_tx,
            live,
            fut: None,
        }
    }

    /// Blocks until the run is finished. Repeatable: every call returns the
    /// same result.
    pub async fn wait_for_result(&self) -> RunResult {
        wait(self.result_rx.clone()).await
    }

    /// The result, if the run has already finished.
    pub fn try_result(&self) -> Option<RunResult> {
        self.result_rx.borrow().clone()
    }

    /// Requests a graceful early stop: in-flight requests finish (bounded by
    /// the per-request timeout) and the result reports
    /// [`RunStatus::Cancelled`](crate::result::RunStatus::Cancelled).
    /// Idempotent; has no effect once the run is over.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Number of currently live virtual users.
    pub fn active_users(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

async fn wait(mut rx: watch::Receiver<Option<RunResult>>) -> RunResult {
    let guard = rx
        .wait_for(|v| v.is_some())
        .await
        .expect("run driver terminated without publishing a result");
    guard.clone().unwrap()
}

impl Future for RunHandle {
    type Output = RunResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.fut.is_none() {
            let rx = this.result_rx.clone();
            *this.fut = Some(Box::pin(wait(rx)));
        }

        if let Some(fut) = this.fut {
            fut.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}
