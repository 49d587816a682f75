//! Simulated motor hardware for running the controller on a host.
//!
//! Each `SimMotor` stands in for one driver + motor + encoder. The direction
//! and PWM halves implement the `embedded-hal` output traits the controller
//! drives; `encoder_task` turns the commanded drive into a first-order motor
//! speed and feeds the matching pulse rate into a `PulseCounter`, the way an
//! edge interrupt would.

use core::{
    convert::Infallible,
    sync::atomic::{AtomicBool, AtomicU16, Ordering},
};

use dmc_core::utils::{
    config::DUTY_MAX,
    controllers::PulseCounter,
    telemetry::{Reporter, SpeedReport},
};
use embassy_time::{Duration, Ticker};
use embedded_hal::{digital, pwm};
use tracing::{error, trace};

/// Encoder simulation period.
const TICK_MS: u64 = 5;

/// Shared state of one simulated motor driver.
pub struct SimMotor {
    forward: AtomicBool,
    duty: AtomicU16,
}

impl SimMotor {
    pub const fn new() -> Self {
        Self {
            forward: AtomicBool::new(false),
            duty: AtomicU16::new(0),
        }
    }

    /// Fraction of full drive the H-bridge applies, in `[0, 1]`.
    ///
    /// With the direction line high the bridge conducts during the PWM low
    /// time, so the duty is inverted.
    pub fn drive(&self) -> f32 {
        let duty = f32::from(self.duty.load(Ordering::Relaxed)) / f32::from(DUTY_MAX);
        if self.forward.load(Ordering::Relaxed) {
            1.0 - duty
        } else {
            duty
        }
    }

    pub fn direction(&'static self) -> SimDirection {
        SimDirection(self)
    }

    pub fn pwm(&'static self) -> SimPwm {
        SimPwm(self)
    }
}

/// Direction output of a simulated driver.
pub struct SimDirection(&'static SimMotor);

impl digital::ErrorType for SimDirection {
    type Error = Infallible;
}

impl digital::OutputPin for SimDirection {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.forward.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.forward.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// 10-bit PWM output of a simulated driver.
pub struct SimPwm(&'static SimMotor);

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        DUTY_MAX
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.0.duty.store(duty.min(DUTY_MAX), Ordering::Relaxed);
        Ok(())
    }
}

/// Physical parameters of the simulated motor and encoder.
#[derive(Debug, Clone, Copy)]
pub struct MotorModel {
    /// Shaft speed at full drive.
    pub max_rpm: f32,
    pub pulses_per_rev: u32,
    /// Fraction of the gap to the target speed closed every tick.
    pub response: f32,
}

/// Generate encoder edges for `motor` into `counter`.
#[embassy_executor::task(pool_size = 2)]
pub async fn encoder_task(
    name: &'static str,
    motor: &'static SimMotor,
    counter: &'static PulseCounter,
    model: MotorModel,
) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    let mut rpm = 0.0f32;
    let mut carry = 0.0f32;
    let pulses_per_tick_per_rpm = model.pulses_per_rev as f32 / 60.0 * TICK_MS as f32 / 1000.0;
    loop {
        ticker.next().await;
        let target = motor.drive() * model.max_rpm;
        rpm += (target - rpm) * model.response;
        carry += rpm * pulses_per_tick_per_rpm;
        while carry >= 1.0 {
            counter.increment();
            carry -= 1.0;
        }
        trace!(motor = name, rpm, "encoder tick");
    }
}

/// Prints reports to stdout, as text lines or JSON lines.
pub struct ConsoleReporter {
    pub json: bool,
}

impl Reporter for ConsoleReporter {
    fn report(
        &mut self,
        report: &SpeedReport,
    ) {
        if !self.json {
            println!(
                "Motor A: {:.1} RPM | Motor B: {:.1} RPM | PWM: {}",
                report.rpm_a, report.rpm_b, report.magnitude
            );
            return;
        }
        match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("failed to encode report: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

    #[test]
    fn forward_drive_is_inverted() {
        static MOTOR: SimMotor = SimMotor::new();
        let (mut dir, mut pwm) = (MOTOR.direction(), MOTOR.pwm());
        dir.set_high().unwrap();
        pwm.set_duty_cycle(0).unwrap();
        assert_eq!(MOTOR.drive(), 1.0);
        pwm.set_duty_cycle(DUTY_MAX).unwrap();
        assert_eq!(MOTOR.drive(), 0.0);
        dir.set_low().unwrap();
        assert_eq!(MOTOR.drive(), 1.0);
    }
}
