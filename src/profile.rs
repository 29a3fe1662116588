//! Load profile variants and construction-time validation.

use crate::error::Error;
use std::time::Duration;

/// The shape of the load a run generates. Immutable once a run starts.
///
/// `Tps` and `Qps` dispatch at a fixed target rate; `Concurrent` holds a
/// fixed number of virtual users; `RampUp` grows the user count linearly
/// over `ramp_duration` and then holds at `target_users` for
/// `hold_duration`. There is no ramp-down; runs end with a graceful drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProfile {
    /// Fixed transactions-per-second for `duration`.
    Tps { rate: u32, duration: Duration },
    /// Fixed queries-per-second for `duration`. Identical dispatch mechanics
    /// to [`LoadProfile::Tps`]; kept distinct so results carry the label the
    /// surrounding toolkit configured.
    Qps { rate: u32, duration: Duration },
    /// Fixed virtual-user count for `duration`.
    Concurrent { users: usize, duration: Duration },
    /// Linear ramp from `start_users` to `target_users` over
    /// `ramp_duration`, then hold for `hold_duration`.
    RampUp {
        start_users: usize,
        target_users: usize,
        ramp_duration: Duration,
        hold_duration: Duration,
    },
}

impl LoadProfile {
    /// Validates per-variant required fields. Fails with
    /// [`Error::Configuration`] before any dispatch.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Tps { rate, duration } | Self::Qps { rate, duration } => {
                if *rate == 0 {
                    return Err(Error::config("rate must be greater than zero"));
                }
                if duration.is_zero() {
                    return Err(Error::config("duration must be greater than zero"));
                }
            }
            Self::Concurrent { users, duration } => {
                if *users == 0 {
                    return Err(Error::config("users must be greater than zero"));
                }
                if duration.is_zero() {
                    return Err(Error::config("duration must be greater than zero"));
                }
            }
            Self::RampUp {
                start_users,
                target_users,
                ramp_duration,
                hold_duration,
            } => {
                if *start_users == 0 {
                    return Err(Error::config("start_users must be greater than zero"));
                }
                if target_users < start_users {
                    return Err(Error::config(
                        "target_users must be greater than or equal to start_users",
                    ));
                }
                if ramp_duration.is_zero() {
                    return Err(Error::config("ramp_duration must be greater than zero"));
                }
                if hold_duration.is_zero() {
                    return Err(Error::config("hold_duration must be greater than zero"));
                }
            }
        }
        Ok(())
    }

    /// Total wall-clock budget for the run.
    pub fn total_duration(&self) -> Duration {
        match self {
            Self::Tps { duration, .. }
            | Self::Qps { duration, .. }
            | Self::Concurrent { duration, .. } => *duration,
            Self::RampUp {
                ramp_duration,
                hold_duration,
                ..
            } => *ramp_duration + *hold_duration,
        }
    }

    /// Target dispatch rate, for the rate-driven variants.
    pub(crate) fn rate(&self) -> Option<u32> {
        match self {
            Self::Tps { rate, .. } | Self::Qps { rate, .. } => Some(*rate),
            _ => None,
        }
    }

    /// Worker count at run start.
    pub(crate) fn initial_users(&self) -> usize {
        match self {
            Self::Tps { .. } | Self::Qps { .. } => crate::constants::STARTING_WORKERS,
            Self::Concurrent { users, .. } => *users,
            Self::RampUp { start_users, .. } => *start_users,
        }
    }

    /// Short label for logs and display.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tps { .. } => "tps",
            Self::Qps { .. } => "qps",
            Self::Concurrent { .. } => "concurrent",
            Self::RampUp { .. } => "ramp_up",
        }
    }
}
