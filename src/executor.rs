//! Seams to the surrounding toolkit: the transport that issues one request
//! and the evaluator that judges one response.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Boxed future returned by [`RequestExecutor::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<ExecutorResponse, TransportError>> + Send + 'a>>;

/// An immutable description of the request each virtual user issues.
///
/// The engine treats this as opaque; interpretation (templating, auth,
/// serialization) belongs to the executor.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// Label used in logs and metrics.
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            name: "request".to_string(),
            method: "GET".to_string(),
            url: url.into(),
            headers: vec![],
            body: None,
        }
    }
}

/// A completed response from the transport layer.
#[derive(Debug, Clone)]
pub struct ExecutorResponse {
    pub status: u16,
    /// Total request latency as measured by the executor.
    pub latency: Duration,
    /// Time to first byte, when the transport can observe it.
    pub time_to_first_byte: Option<Duration>,
    pub body: Vec<u8>,
}

/// A failure below the protocol layer (connect, DNS, TLS, broken stream).
#[derive(Debug, Clone, Error)]
#[error("transport error: {detail}")]
pub struct TransportError {
    pub detail: String,
}

impl TransportError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Sends one request and returns a complete outcome.
///
/// Implementations own connection pooling, TLS, and retries below this
/// layer. `execute` should respect `timeout` where it can; the engine
/// additionally enforces it from the outside and classifies overruns as
/// timeouts.
pub trait RequestExecutor: Send + Sync {
    fn execute<'a>(&'a self, spec: &'a RequestSpec, timeout: Duration) -> ExecFuture<'a>;

    /// Called once before any dispatch. Returning an error fails the run
    /// synchronously with a configuration-class error, for transports that
    /// can tell up front they cannot serve the spec at all.
    fn preflight(&self, _spec: &RequestSpec) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Verdict from the assertion layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    Pass,
    Fail(String),
}

/// Judges one successful response. Evaluations run on the worker's hot path
/// and must not block on I/O.
pub trait AssertionEvaluator: Send + Sync {
    fn evaluate(&self, response: &ExecutorResponse) -> Assertion;
}

/// Accepts every response. Useful when the caller only cares about
/// transport-level success.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AssertionEvaluator for AcceptAll {
    fn evaluate(&self, _response: &ExecutorResponse) -> Assertion {
        Assertion::Pass
    }
}
