//! Interrupt-driven encoder pulse counting.
//!
//! A [`PulseCounter`] is shared between exactly two contexts: the edge
//! interrupt of one encoder, which only increments, and the control loop,
//! which only drains it. The drain is a single atomic swap, so an edge that
//! lands during the drain is either part of the returned window or the first
//! pulse of the next one.
//!
//! ```rust
//! use dmc_core::utils::controllers::encoder::PulseCounter;
//!
//! static ENCODER_A: PulseCounter = PulseCounter::new();
//!
//! // from the rising-edge handler
//! ENCODER_A.increment();
//!
//! // from the control loop
//! assert_eq!(ENCODER_A.read_and_reset(), 1);
//! assert_eq!(ENCODER_A.read_and_reset(), 0);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

/// Rising-edge counter for one single-channel encoder.
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Record one rising edge. Safe to call from interrupt context.
    #[inline]
    pub fn increment(&self) {
        // Relaxed: the count is the only data carried across contexts.
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the pulses accumulated since the previous call and restart at zero.
    #[inline]
    pub fn read_and_reset(&self) -> u32 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Pulses accumulated in the current window, without draining them.
    #[inline]
    pub fn pending(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_read_without_edges_is_zero() {
        let counter = PulseCounter::new();
        for _ in 0..7 {
            counter.increment();
        }
        assert_eq!(counter.read_and_reset(), 7);
        assert_eq!(counter.read_and_reset(), 0);
    }

    #[test]
    fn pending_does_not_drain() {
        let counter = PulseCounter::new();
        counter.increment();
        counter.increment();
        assert_eq!(counter.pending(), 2);
        assert_eq!(counter.pending(), 2);
        assert_eq!(counter.read_and_reset(), 2);
        assert_eq!(counter.pending(), 0);
    }

    #[test]
    fn windows_partition_the_edges() {
        let counter = PulseCounter::new();
        let bursts = [3u32, 0, 12, 1, 0, 40];
        let mut observed = 0;
        for burst in bursts {
            for _ in 0..burst {
                counter.increment();
            }
            observed += counter.read_and_reset();
        }
        assert_eq!(observed, bursts.iter().sum::<u32>());
    }
}
