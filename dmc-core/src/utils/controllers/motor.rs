//! Direction + PWM drive for one DC motor.
//!
//! Each motor is wired to one direction output and one PWM output. The logical
//! command is a magnitude in `[0, 255]` and a direction. Duties are kept in
//! 10-bit units (`[0, 1023]`) and written as a fraction of the peripheral's
//! `max_duty_cycle()`, so the PWM may run at any resolution.
//!
//! In the forward direction the magnitude is inverted before it reaches the
//! PWM (`255 - magnitude`): with the direction line high, the driver's speed
//! follows the low time of the PWM line.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use crate::utils::config::{DUTY_MAX, MAX_MAGNITUDE};

/// Errors from the two outputs of a motor channel.
#[derive(Debug)]
pub enum MotorError<DE: core::fmt::Debug, PE: core::fmt::Debug> {
    Direction(DE),
    Duty(PE),
}

/// Hardware duty for a logical command.
///
/// The magnitude is clamped to `[0, 255]`, inverted when `forward`, then
/// scaled to `[0, 1023]` with rounding.
pub fn duty_for(
    magnitude: i32,
    forward: bool,
) -> u16 {
    let max = i32::from(MAX_MAGNITUDE);
    let magnitude = magnitude.clamp(0, max);
    let effective = if forward { max - magnitude } else { magnitude };
    let (effective, max) = (effective as u32, max as u32);
    ((effective * u32::from(DUTY_MAX) + max / 2) / max) as u16
}

/// One motor's direction and duty outputs, plus a mirror of what was last
/// written to them.
pub struct MotorChannel<DIR, PWM> {
    dir: DIR,
    pwm: PWM,
    duty: u16,
    forward: bool,
}

impl<DIR, PWM> MotorChannel<DIR, PWM>
where
    DIR: OutputPin,
    PWM: SetDutyCycle,
{
    /// Wrap the outputs. Nothing is written until the first [`command`](Self::command).
    pub fn new(
        dir: DIR,
        pwm: PWM,
    ) -> Self {
        Self {
            dir,
            pwm,
            duty: 0,
            forward: false,
        }
    }

    /// Drive the direction line, then the PWM duty.
    ///
    /// Out-of-range magnitudes are clamped. The duty is scaled to the PWM's
    /// own resolution; the mirror records it in 10-bit units, and only once
    /// it was written successfully.
    pub fn command(
        &mut self,
        magnitude: i32,
        forward: bool,
    ) -> Result<(), MotorError<DIR::Error, PWM::Error>> {
        let duty = duty_for(magnitude, forward);

        let level = if forward {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
        level.map_err(MotorError::Direction)?;
        self.forward = forward;

        self.pwm
            .set_duty_cycle_fraction(duty, DUTY_MAX)
            .map_err(MotorError::Duty)?;
        self.duty = duty;

        tracing::trace!(magnitude, forward, duty, "motor commanded");
        Ok(())
    }

    /// Last duty written to the PWM output, in 10-bit units.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// Last level written to the direction output.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Give the outputs back.
    pub fn release(self) -> (DIR, PWM) {
        (self.dir, self.pwm)
    }
}
