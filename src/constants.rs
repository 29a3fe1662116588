use std::time::Duration;

/// Watchdog/ramp tick. Concurrency changes and threshold checks happen on
/// this cadence rather than per-outcome to avoid thrashing worker churn.
pub const CONTROL_INTERVAL: Duration = Duration::from_millis(100);

/// Initial worker count for rate-driven profiles. Widened on dispatch
/// deficit until the target rate is sustained.
pub const STARTING_WORKERS: usize = 4;

/// Largest single adjustment the coordinator will make to a rate-driven
/// worker pool on one tick.
pub const MAX_WORKER_STEP: usize = 100;

/// Hard cap on workers for rate-driven profiles.
pub const MAX_RATE_WORKERS: usize = 1024;

/// Minimum completed requests before the error threshold is evaluated, so a
/// single early failure cannot abort a run.
pub const MIN_THRESHOLD_SAMPLE: u64 = 20;
