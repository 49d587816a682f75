//! Controller configuration.
//!
//! All tunables live in one `Copy` struct that is validated once when the
//! control loop is constructed and never changes afterwards.

use serde::{Deserialize, Serialize};

/// Upper bound of the logical command magnitude.
pub const MAX_MAGNITUDE: u8 = 255;
/// Upper bound of the hardware duty range (10-bit PWM).
pub const DUTY_MAX: u16 = 1023;

pub const PWM_FREQUENCY_HZ: u32 = 5_000;
pub const PULSES_PER_REV: u32 = 20;
pub const ACCEL_STEP: u8 = 5;
/// Ramp step delay, which is also the speed sampling interval.
pub const STEP_INTERVAL_MS: u32 = 200;
pub const HOLD_MS: u32 = 2_000;
pub const STOP_PAUSE_MS: u32 = 2_000;

/// Rejected configurations, reported before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroPulsesPerRev,
    ZeroStepInterval,
    ZeroAccelStep,
    ZeroMaxMagnitude,
    ZeroPwmFrequency,
}

/// Tunables for the ramp controller.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// PWM carrier frequency, applied by the platform at init.
    pub pwm_frequency_hz: u32,
    /// Peak magnitude of the ramp, at most [`MAX_MAGNITUDE`].
    pub max_magnitude: u8,
    /// Encoder pulses per shaft revolution.
    pub pulses_per_rev: u32,
    /// Magnitude increment between ramp steps.
    pub accel_step: u8,
    /// Delay between ramp steps and length of a speed sampling window.
    pub step_interval_ms: u32,
    /// Pause at peak magnitude between ramp-up and ramp-down.
    pub hold_ms: u32,
    /// Pause after the motors are commanded to zero.
    pub stop_pause_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: PWM_FREQUENCY_HZ,
            max_magnitude: MAX_MAGNITUDE,
            pulses_per_rev: PULSES_PER_REV,
            accel_step: ACCEL_STEP,
            step_interval_ms: STEP_INTERVAL_MS,
            hold_ms: HOLD_MS,
            stop_pause_ms: STOP_PAUSE_MS,
        }
    }
}

impl ControllerConfig {
    /// Check every field the control loop divides by or steps with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulses_per_rev == 0 {
            return Err(ConfigError::ZeroPulsesPerRev);
        }
        if self.step_interval_ms == 0 {
            return Err(ConfigError::ZeroStepInterval);
        }
        if self.accel_step == 0 {
            return Err(ConfigError::ZeroAccelStep);
        }
        if self.max_magnitude == 0 {
            return Err(ConfigError::ZeroMaxMagnitude);
        }
        if self.pwm_frequency_hz == 0 {
            return Err(ConfigError::ZeroPwmFrequency);
        }
        Ok(())
    }

    /// Length of one sampling window in seconds.
    pub fn step_interval_secs(&self) -> f32 {
        self.step_interval_ms as f32 / 1000.0
    }
}
