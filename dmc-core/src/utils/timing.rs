//! Time source for the control loop.
//!
//! The loop never touches `embassy_time` directly; it goes through [`Clock`]
//! so tests can drive every ramp phase on a virtual clock.

use embassy_time::{Instant, Timer};

/// Millisecond clock with a cooperative sleep.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current time in milliseconds. Wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`, correct across one wraparound.
    fn elapsed_ms(
        &self,
        since: u32,
    ) -> u32 {
        self.now_ms().wrapping_sub(since)
    }

    /// Suspend the caller for `ms` milliseconds.
    async fn sleep_ms(
        &mut self,
        ms: u32,
    );
}

/// [`Clock`] backed by the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }

    async fn sleep_ms(
        &mut self,
        ms: u32,
    ) {
        Timer::after_millis(u64::from(ms)).await;
    }
}
