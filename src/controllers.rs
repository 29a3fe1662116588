//! Dispatch-schedule controllers. The rate controller paces rate-driven
//! profiles; the ramp controller schedules the worker count for ramped
//! profiles. Both are consulted off the hot path where possible: workers
//! only touch the rate limiter, everything else runs on the watchdog tick.

mod ramp;
mod rate;

pub(crate) use ramp::{RampController, RampState};
pub(crate) use rate::RateController;
