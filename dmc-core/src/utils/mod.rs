//! Utility re-exports and helper macros for the dual motor controller.
//!
//! - `config`: controller constants and the validated `ControllerConfig`
//! - `controllers`: encoder counters, motor channels and the ramp control loop
//! - `math`: speed estimation from pulse counts
//! - `telemetry`: speed reports and reporter sinks
//! - `timing`: the injectable `Clock` used by the control loop
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod math;
pub mod telemetry;
pub mod timing;

pub use config::{ConfigError, ControllerConfig};
pub use controllers::{
    ControlLoop, MotorChannel, PulseCounter, RampCommand, RAMP_CHANNEL, STOP_SIGNAL,
};
pub use math::speed::estimate_rpm;
pub use telemetry::{Reporter, SpeedReport, TracingReporter};
pub use timing::{Clock, EmbassyClock};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
