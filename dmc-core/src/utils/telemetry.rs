//! Speed telemetry.
//!
//! The control loop hands one [`SpeedReport`] per ramp step to a [`Reporter`]
//! and never looks at what the sink does with it.

use serde::Serialize;

use crate::utils::controllers::ramp::RampPhase;

/// Speeds observed after one ramp step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedReport {
    pub rpm_a: f32,
    pub rpm_b: f32,
    /// Logical magnitude commanded to both motors for this step.
    pub magnitude: u8,
    pub phase: RampPhase,
}

/// Sink for speed reports.
pub trait Reporter {
    fn report(
        &mut self,
        report: &SpeedReport,
    );
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(
        &mut self,
        report: &SpeedReport,
    ) {
        (**self).report(report)
    }
}

/// Reporter that logs each report through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(
        &mut self,
        report: &SpeedReport,
    ) {
        tracing::info!(
            "Motor A: {:.1} RPM | Motor B: {:.1} RPM | PWM: {}",
            report.rpm_a,
            report.rpm_b,
            report.magnitude
        );
    }
}
