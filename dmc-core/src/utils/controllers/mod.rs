//! Module Exports
//!
//! This file exports the pieces of the dual motor control loop.
//!
//! - `encoder`: interrupt-safe pulse counters for the two encoders.
//! - `motor`: direction + PWM drive for one motor.
//! - `ramp`: the accelerate/hold/decelerate/stop state machine.
//!
//! [`ControlLoop`] ties them together: it commands both motors in lockstep,
//! samples both encoders after every ramp step and reports the speeds.

pub mod encoder;
pub mod motor;
pub mod ramp;

use core::convert::Infallible;

use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};
use serde::{Deserialize, Serialize};

pub use encoder::PulseCounter;
pub use motor::{MotorChannel, MotorError};
pub use ramp::{RampAction, RampPhase, RampSequencer};

use crate::utils::{
    config::{ConfigError, ControllerConfig},
    math::speed::estimate_rpm,
    telemetry::{Reporter, SpeedReport},
    timing::Clock,
};

/// Signal used to cut a running cycle short.
pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Channel used to receive ramp commands (`RampCommand` messages).
pub static RAMP_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, RampCommand, 4> =
    embassy_sync::channel::Channel::new();

/// Raised to stop the cycle currently run by [`ControlLoop::serve`].
pub static STOP_SIGNAL: StopSignal = Signal::new();

/// Ramp command variants.
///
/// Serialized as JSON with tag `"rc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "rc", rename_all = "snake_case")]
pub enum RampCommand {
    /// Run one full ramp cycle in the given direction.
    Cycle { forward: bool },
    /// Command both motors to zero.
    Halt,
}

/// Fatal hardware failures, tagged with the motor that failed.
#[derive(Debug)]
pub enum ControlError<DE: core::fmt::Debug, PE: core::fmt::Debug> {
    MotorA(MotorError<DE, PE>),
    MotorB(MotorError<DE, PE>),
}

/// How a cancellable cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// A stop request arrived; both motors were commanded to zero.
    Cancelled,
}

/// The two-motor ramp controller.
///
/// Owns both motor channels and borrows both encoder counters, which are
/// shared with the edge interrupt handlers.
pub struct ControlLoop<'a, DIR, PWM, C, R> {
    motor_a: MotorChannel<DIR, PWM>,
    motor_b: MotorChannel<DIR, PWM>,
    encoder_a: &'a PulseCounter,
    encoder_b: &'a PulseCounter,
    config: ControllerConfig,
    clock: C,
    reporter: R,
    sequencer: RampSequencer,
    forward: bool,
    magnitude: u8,
    speeds: (f32, f32),
    last_sample_ms: u32,
}

impl<'a, DIR, PWM, C, R> ControlLoop<'a, DIR, PWM, C, R>
where
    DIR: OutputPin,
    PWM: SetDutyCycle,
    C: Clock,
    R: Reporter,
{
    /// Build the controller. The configuration is checked before anything else.
    pub fn new(
        motor_a: MotorChannel<DIR, PWM>,
        motor_b: MotorChannel<DIR, PWM>,
        encoder_a: &'a PulseCounter,
        encoder_b: &'a PulseCounter,
        config: ControllerConfig,
        clock: C,
        reporter: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let last_sample_ms = clock.now_ms();
        Ok(Self {
            motor_a,
            motor_b,
            encoder_a,
            encoder_b,
            sequencer: RampSequencer::new(config.max_magnitude, config.accel_step),
            config,
            clock,
            reporter,
            forward: true,
            magnitude: 0,
            speeds: (0.0, 0.0),
            last_sample_ms,
        })
    }

    /// Put both motors in a known state: forward direction, zero magnitude.
    pub fn init(&mut self) -> Result<(), ControlError<DIR::Error, PWM::Error>> {
        self.forward = true;
        self.command_both(0)?;
        tracing::info!("Motor outputs initialized");
        Ok(())
    }

    pub fn phase(&self) -> RampPhase {
        self.sequencer.phase()
    }

    /// Magnitude last commanded to both motors.
    pub fn magnitude(&self) -> u8 {
        self.magnitude
    }

    /// Latest speed samples `(motor A, motor B)` in RPM.
    pub fn speeds(&self) -> (f32, f32) {
        self.speeds
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn motors(&self) -> (&MotorChannel<DIR, PWM>, &MotorChannel<DIR, PWM>) {
        (&self.motor_a, &self.motor_b)
    }

    /// Arm a cycle in the given direction.
    ///
    /// Returns `false` without changing anything if a cycle is already
    /// running; the direction is fixed for the whole cycle.
    pub fn start(
        &mut self,
        forward: bool,
    ) -> bool {
        if !self.sequencer.start() {
            tracing::warn!("ramp already running, start ignored");
            return false;
        }
        self.forward = forward;
        self.rebase_window();
        tracing::info!(
            "Starting gradual acceleration ({})",
            if forward { "Forward" } else { "Reverse" }
        );
        true
    }

    /// Execute the next action of the running cycle and return the new phase.
    ///
    /// Returns `Idle` immediately when no cycle is armed.
    pub async fn step(&mut self) -> Result<RampPhase, ControlError<DIR::Error, PWM::Error>> {
        self.step_inner(None).await?;
        Ok(self.phase())
    }

    /// Run one complete cycle: ramp up, hold, ramp down, stop.
    ///
    /// If a cycle was already armed with [`start`](Self::start), that cycle is
    /// finished in its own direction and `forward` is ignored.
    pub async fn run_cycle(
        &mut self,
        forward: bool,
    ) -> Result<(), ControlError<DIR::Error, PWM::Error>> {
        self.arm(forward);
        while self.phase() != RampPhase::Idle {
            self.step_inner(None).await?;
        }
        Ok(())
    }

    /// Run one cycle that ends early when `stop` is raised.
    ///
    /// The request is honoured before each action and during every sleep. On
    /// cancellation both motors are commanded to zero before returning. An
    /// already armed cycle is finished as in [`run_cycle`](Self::run_cycle).
    pub async fn run_cycle_until(
        &mut self,
        forward: bool,
        stop: &StopSignal,
    ) -> Result<CycleOutcome, ControlError<DIR::Error, PWM::Error>> {
        self.arm(forward);
        while self.phase() != RampPhase::Idle {
            if stop.signaled() || !self.step_inner(Some(stop)).await? {
                stop.reset();
                tracing::warn!("Ramp cancelled at magnitude {}", self.magnitude);
                self.halt()?;
                return Ok(CycleOutcome::Cancelled);
            }
        }
        Ok(CycleOutcome::Completed)
    }

    /// Command both motors to zero and drop the running cycle, if any.
    pub fn halt(&mut self) -> Result<(), ControlError<DIR::Error, PWM::Error>> {
        self.sequencer.reset();
        self.command_both(0)?;
        tracing::info!("Motors halted");
        Ok(())
    }

    /// Alternate forward and reverse cycles forever.
    ///
    /// Only returns on a hardware failure.
    pub async fn run(&mut self) -> Result<Infallible, ControlError<DIR::Error, PWM::Error>> {
        loop {
            self.run_cycle(true).await?;
            self.run_cycle(false).await?;
        }
    }

    /// Execute commands received on [`RAMP_CHANNEL`], honouring
    /// [`STOP_SIGNAL`] while a cycle runs.
    ///
    /// Only returns on a hardware failure.
    pub async fn serve(&mut self) -> Result<Infallible, ControlError<DIR::Error, PWM::Error>> {
        loop {
            let command = RAMP_CHANNEL.receiver().receive().await;
            tracing::info!("Received ramp command: {:?}", command);
            let result = match command {
                RampCommand::Cycle { forward } => {
                    // A stop raised while idle must not cancel the next cycle.
                    STOP_SIGNAL.reset();
                    self.run_cycle_until(forward, &STOP_SIGNAL).await.map(|outcome| {
                        tracing::info!(?outcome, "ramp cycle finished");
                    })
                }
                RampCommand::Halt => self.halt(),
            };
            if let Err(e) = result {
                tracing::error!("Ramp command failed: {:?}", e);
                return Err(e);
            }
        }
    }

    /// Start a cycle unless one is running, in which case it keeps its direction.
    fn arm(
        &mut self,
        forward: bool,
    ) {
        if !self.start(forward) && self.forward != forward {
            tracing::warn!(
                "finishing the running {} cycle first",
                if self.forward { "forward" } else { "reverse" }
            );
        }
    }

    /// Execute one sequencer action. Returns `false` if `stop` interrupted a sleep.
    async fn step_inner(
        &mut self,
        stop: Option<&StopSignal>,
    ) -> Result<bool, ControlError<DIR::Error, PWM::Error>> {
        let phase = self.sequencer.phase();
        let Some(action) = self.sequencer.advance() else {
            return Ok(true);
        };

        match action {
            RampAction::Command(magnitude) => {
                self.command_both(magnitude)?;
                if !self.sleep(self.config.step_interval_ms, stop).await {
                    return Ok(false);
                }
                self.sample();
                self.reporter.report(&SpeedReport {
                    rpm_a: self.speeds.0,
                    rpm_b: self.speeds.1,
                    magnitude,
                    phase,
                });
                match self.phase() {
                    RampPhase::Holding => tracing::info!("Reached maximum speed!"),
                    RampPhase::Stopped => tracing::info!("Motors stopped!"),
                    _ => {}
                }
            }
            RampAction::Hold => {
                if !self.sleep(self.config.hold_ms, stop).await {
                    return Ok(false);
                }
                self.rebase_window();
                tracing::info!("Starting gradual deceleration");
            }
            RampAction::Pause => {
                if !self.sleep(self.config.stop_pause_ms, stop).await {
                    return Ok(false);
                }
                self.rebase_window();
            }
        }
        Ok(true)
    }

    /// Command A then B. Both are issued before the caller sleeps.
    fn command_both(
        &mut self,
        magnitude: u8,
    ) -> Result<(), ControlError<DIR::Error, PWM::Error>> {
        let magnitude_i = i32::from(magnitude);
        self.motor_a
            .command(magnitude_i, self.forward)
            .map_err(ControlError::MotorA)?;
        self.motor_b
            .command(magnitude_i, self.forward)
            .map_err(ControlError::MotorB)?;
        self.magnitude = magnitude;
        Ok(())
    }

    /// Sleep for `ms`, or until `stop` is raised. Returns `false` when stopped.
    async fn sleep(
        &mut self,
        ms: u32,
        stop: Option<&StopSignal>,
    ) -> bool {
        match stop {
            None => {
                self.clock.sleep_ms(ms).await;
                true
            }
            Some(stop) => match select(self.clock.sleep_ms(ms), stop.wait()).await {
                Either::First(()) => true,
                Either::Second(()) => false,
            },
        }
    }

    /// Drain both encoders into new speed samples once a full window has elapsed.
    fn sample(&mut self) {
        let elapsed = self.clock.elapsed_ms(self.last_sample_ms);
        if elapsed < self.config.step_interval_ms {
            tracing::debug!(elapsed, "speed sample not yet due");
            return;
        }

        let pulses_a = self.encoder_a.read_and_reset();
        let pulses_b = self.encoder_b.read_and_reset();
        self.last_sample_ms = self.clock.now_ms();

        let window = self.config.step_interval_secs();
        let ppr = self.config.pulses_per_rev;
        if let Some(rpm) = estimate_rpm(pulses_a, window, ppr) {
            self.speeds.0 = rpm;
        }
        if let Some(rpm) = estimate_rpm(pulses_b, window, ppr) {
            self.speeds.1 = rpm;
        }
        tracing::trace!(pulses_a, pulses_b, "speed sampled");
    }

    /// Start a fresh sampling window, discarding pulses counted during a pause.
    fn rebase_window(&mut self) {
        let dropped_a = self.encoder_a.read_and_reset();
        let dropped_b = self.encoder_b.read_and_reset();
        self.last_sample_ms = self.clock.now_ms();
        tracing::trace!(dropped_a, dropped_b, "sampling window rebased");
    }
}
