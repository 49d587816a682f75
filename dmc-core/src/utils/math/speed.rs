//! Encoder speed estimation.
//!
//! Converts a pulse count observed over a known window into shaft speed:
//!
//! `rpm = (pulses / pulses_per_rev) * 60 / elapsed_seconds`
//!
//! # Example
//! ```rust
//! use dmc_core::utils::math::speed::estimate_rpm;
//! let rpm = estimate_rpm(10, 0.2, 20).unwrap();
//! assert!((rpm - 150.0).abs() < 1e-3);
//! ```

/// Seconds per minute.
const SECS_PER_MIN: f32 = 60.0;

/// Estimate shaft speed in revolutions per minute.
///
/// Returns `None` when the window is not a positive, finite number of seconds
/// or when `pulses_per_rev` is zero. Callers keep their previous sample in
/// that case.
pub fn estimate_rpm(
    pulses: u32,
    elapsed_seconds: f32,
    pulses_per_rev: u32,
) -> Option<f32> {
    if pulses_per_rev == 0 || !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
        return None;
    }
    let revolutions = pulses as f32 / pulses_per_rev as f32;
    Some(revolutions * SECS_PER_MIN / elapsed_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_pulses_in_200ms_at_20_ppr() {
        let rpm = estimate_rpm(10, 0.2, 20).unwrap();
        assert!((rpm - 150.0).abs() < 1e-3);
    }

    #[test]
    fn zero_pulses_is_zero_rpm() {
        for t in [0.001, 0.2, 1.0, 60.0] {
            assert_eq!(estimate_rpm(0, t, 20), Some(0.0));
        }
    }

    #[test]
    fn matches_formula() {
        for &(p, t, ppr) in &[(1u32, 1.0f32, 1u32), (37, 0.25, 11), (4000, 0.2, 20), (960, 2.0, 960)] {
            let expected = (p as f32 / ppr as f32) * 60.0 / t;
            let rpm = estimate_rpm(p, t, ppr).unwrap();
            assert!((rpm - expected).abs() <= expected.abs() * 1e-6);
        }
    }

    #[test]
    fn degenerate_window_yields_no_sample() {
        assert_eq!(estimate_rpm(10, 0.0, 20), None);
        assert_eq!(estimate_rpm(10, -0.2, 20), None);
        assert_eq!(estimate_rpm(10, f32::NAN, 20), None);
        assert_eq!(estimate_rpm(10, f32::INFINITY, 20), None);
        assert_eq!(estimate_rpm(10, 0.2, 0), None);
    }
}
