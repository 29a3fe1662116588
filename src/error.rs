use thiserror::Error;

/// Run-level errors surfaced from the coordinator.
///
/// Per-request failures (timeouts, transport errors, rejected assertions) are
/// counted in the [`RunResult`](crate::result::RunResult) and never abort a
/// run; only invalid configuration or reuse of a coordinator surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid profile parameters or an executor that cannot dispatch at all.
    /// Always raised before any request is issued.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The coordinator was already used for a run.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
