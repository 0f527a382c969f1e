//! Time and timing module.
//!
//! Tick-counter based timeouts. The tick source is whatever free-running
//! counter the platform offers (TSC, generic timer, a host clock in tests).

/// Free-running monotonic tick source.
pub trait Clock {
    /// Current tick count. Wraps; callers compare with `wrapping_sub`.
    fn ticks(&self) -> u64;
}

/// Timeout configuration derived from the tick frequency.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    ticks_per_ms: u64,
}

impl TimeoutConfig {
    /// Create from tick frequency (Hz).
    pub fn new(tick_freq: u64) -> Self {
        Self {
            ticks_per_ms: (tick_freq / 1_000).max(1),
        }
    }

    /// Convert milliseconds to ticks
    #[inline]
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.ticks_per_ms)
    }

    /// Convert ticks to milliseconds
    #[inline]
    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        ticks / self.ticks_per_ms
    }
}

/// A deadline measured against a [`Clock`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u64,
    budget: u64,
}

impl Deadline {
    pub fn after_ms<C: Clock>(clock: &C, timeouts: &TimeoutConfig, ms: u64) -> Self {
        Self {
            start: clock.ticks(),
            budget: timeouts.ms_to_ticks(ms),
        }
    }

    #[inline]
    pub fn expired<C: Clock>(&self, clock: &C) -> bool {
        clock.ticks().wrapping_sub(self.start) > self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FakeClock(Cell<u64>);

    impl Clock for FakeClock {
        fn ticks(&self) -> u64 {
            self.0.get()
        }
    }

    #[test]
    fn test_ms_conversion() {
        let t = TimeoutConfig::new(2_000_000);
        assert_eq!(t.ms_to_ticks(5), 10_000);
        assert_eq!(t.ticks_to_ms(10_000), 5);
    }

    #[test]
    fn test_slow_clock_never_divides_by_zero() {
        let t = TimeoutConfig::new(10);
        assert_eq!(t.ticks_to_ms(7), 7);
    }

    #[test]
    fn test_deadline_survives_counter_wrap() {
        let clock = FakeClock(Cell::new(u64::MAX - 5));
        let t = TimeoutConfig::new(1_000);
        let d = Deadline::after_ms(&clock, &t, 10);
        clock.0.set(3);
        assert!(!d.expired(&clock));
        clock.0.set(5);
        assert!(d.expired(&clock));
    }
}
