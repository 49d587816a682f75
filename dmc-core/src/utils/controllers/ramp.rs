//! Ramp schedule as an explicit state machine.
//!
//! The sequencer knows nothing about time or hardware. Each call to
//! [`RampSequencer::advance`] yields the next [`RampAction`] and moves the
//! phase forward:
//!
//! ```text
//! Idle -> RampingUp -> Holding -> RampingDown -> Stopped -> Idle
//! ```
//!
//! Both ramps include their end points, and the last step of each ramp is
//! clamped so it lands exactly on the peak (or on zero).

use serde::{Deserialize, Serialize};

/// Phase of the ramp cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampPhase {
    Idle,
    RampingUp,
    Holding,
    RampingDown,
    Stopped,
}

/// What the control loop must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampAction {
    /// Command both motors to this magnitude, wait one step, sample, report.
    Command(u8),
    /// Pause at peak magnitude without issuing commands.
    Hold,
    /// Pause after the motors have been commanded to zero.
    Pause,
}

/// Step-by-step generator for one accelerate/hold/decelerate/stop cycle.
#[derive(Debug, Clone)]
pub struct RampSequencer {
    phase: RampPhase,
    /// Magnitude of the next `Command` action.
    next: u8,
    peak: u8,
    step: u8,
}

impl RampSequencer {
    /// Create an idle sequencer ramping to `peak` in increments of `step`.
    ///
    /// `step` must be non-zero; the controller config guarantees it.
    pub fn new(
        peak: u8,
        step: u8,
    ) -> Self {
        Self {
            phase: RampPhase::Idle,
            next: 0,
            peak,
            step,
        }
    }

    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    /// Arm a new cycle. Returns `false` if a cycle is already running.
    pub fn start(&mut self) -> bool {
        if self.phase != RampPhase::Idle {
            return false;
        }
        self.phase = RampPhase::RampingUp;
        self.next = 0;
        true
    }

    /// Abandon the current cycle.
    pub fn reset(&mut self) {
        self.phase = RampPhase::Idle;
        self.next = 0;
    }

    /// Produce the next action, or `None` once the cycle is back to `Idle`.
    pub fn advance(&mut self) -> Option<RampAction> {
        match self.phase {
            RampPhase::Idle => None,
            RampPhase::RampingUp => {
                let magnitude = self.next;
                if magnitude >= self.peak {
                    self.phase = RampPhase::Holding;
                } else {
                    self.next = magnitude.saturating_add(self.step).min(self.peak);
                }
                Some(RampAction::Command(magnitude))
            }
            RampPhase::Holding => {
                self.phase = RampPhase::RampingDown;
                self.next = self.peak;
                Some(RampAction::Hold)
            }
            RampPhase::RampingDown => {
                let magnitude = self.next;
                if magnitude == 0 {
                    self.phase = RampPhase::Stopped;
                } else {
                    self.next = magnitude.saturating_sub(self.step);
                }
                Some(RampAction::Command(magnitude))
            }
            RampPhase::Stopped => {
                self.phase = RampPhase::Idle;
                Some(RampAction::Pause)
            }
        }
    }
}
