use std::time::Duration;

/// Phase of a ramped run at a given elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RampState {
    RampingUp,
    Holding,
    Stopped,
}

/// Timed concurrency schedule for the RampUp profile.
///
/// Active user count grows linearly from `start_users` to `target_users`
/// over `ramp_duration`, holds at `target_users` for `hold_duration`, and
/// then the run ends with a graceful drain. The schedule is recomputed on
/// the watchdog tick only, never per-outcome, so worker churn stays bounded.
#[derive(Debug, Clone)]
pub(crate) struct RampController {
    start_users: usize,
    target_users: usize,
    ramp_duration: Duration,
    hold_duration: Duration,
}

impl RampController {
    pub fn new(
        start_users: usize,
        target_users: usize,
        ramp_duration: Duration,
        hold_duration: Duration,
    ) -> Self {
        Self {
            start_users,
            target_users,
            ramp_duration,
            hold_duration,
        }
    }

    pub fn state_at(&self, elapsed: Duration) -> RampState {
        if elapsed < self.ramp_duration {
            RampState::RampingUp
        } else if elapsed < self.ramp_duration + self.hold_duration {
            RampState::Holding
        } else {
            RampState::Stopped
        }
    }

    /// Scheduled user count at elapsed time `t`. Monotone non-decreasing.
    pub fn users_at(&self, elapsed: Duration) -> usize {
        let ramp = self.ramp_duration.as_secs_f64();
        let progress = (elapsed.as_secs_f64() / ramp).min(1.);
        let span = (self.target_users - self.start_users) as f64;
        self.start_users + (span * progress).round() as usize
    }
}
