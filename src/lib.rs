#![cfg_attr(docsrs, feature(doc_cfg))]
//! Load-generation and metrics-aggregation engine.
//!
//! This crate is the core of a performance-testing toolkit: it drives a
//! target service with synthetic traffic under a [`LoadProfile`] (fixed
//! throughput, fixed concurrency, or ramped concurrency), enforces
//! per-request timeout and assertion policy, and aggregates every attempt
//! into a [`RunResult`] with latency percentiles, error composition, and
//! achieved throughput.
//!
//! Transport and assertions are seams: callers supply a
//! [`RequestExecutor`](executor::RequestExecutor) (send one request, return
//! an outcome) and an [`AssertionEvaluator`](executor::AssertionEvaluator)
//! (judge a response). Report rendering, configuration parsing, and request
//! templating live in the surrounding toolkit.
//!
//! ```no_run
//! use loadcore::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(executor: Arc<dyn RequestExecutor>) {
//! let coordinator = RunCoordinator::new(executor, Arc::new(AcceptAll));
//! let plan = RunPlan::new(
//!     LoadProfile::Tps { rate: 50, duration: Duration::from_secs(10) },
//!     RequestSpec::get("https://example.com/health"),
//!     Duration::from_secs(5),
//! )
//! .with_error_threshold(0.05);
//!
//! let handle = coordinator.start_run(plan).unwrap();
//! let result = handle.wait_for_result().await;
//! println!("{result}");
//! # }
//! ```

pub mod coordinator;
pub mod executor;
pub mod handle;
pub mod histogram;
pub mod outcome;
pub mod profile;
pub mod result;

pub(crate) mod aggregator;
pub(crate) mod constants;
pub(crate) mod controllers;
pub(crate) mod pool;

mod error;

pub use coordinator::{RunCoordinator, RunPlan};
pub use error::Error;
pub use handle::RunHandle;
pub use profile::LoadProfile;
pub use result::{LatencySummary, RunResult, RunStatus};

pub mod prelude {
    pub use crate::coordinator::{RunCoordinator, RunPlan};
    pub use crate::error::Error;
    pub use crate::executor::{
        AcceptAll, Assertion, AssertionEvaluator, ExecutorResponse, RequestExecutor, RequestSpec,
        TransportError,
    };
    pub use crate::handle::RunHandle;
    pub use crate::outcome::OutcomeKind;
    pub use crate::profile::LoadProfile;
    pub use crate::result::{LatencySummary, RunResult, RunStatus};
}
