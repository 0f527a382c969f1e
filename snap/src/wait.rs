//! Wait handle between the interrupt producer and the blocked consumer.
//!
//! Binary semaphore semantics: `notify` latches a single pending signal,
//! `wait` consumes it. A signal is a hint that *something* changed; the
//! consumer always re-checks the transfer record after waking.

use core::sync::atomic::{AtomicBool, Ordering};

use cgsnap_core::{Clock, Deadline, TimeoutConfig};

/// Signal owned by the transfer subsystem.
pub trait WaitHandle {
    /// Latch a signal and wake the waiter. Must not block; ISR-safe.
    fn notify(&self);

    /// Wait up to `timeout_ms` for a signal. Returns `false` on timeout.
    fn wait(&self, timeout_ms: u32) -> bool;

    /// Drop any pending signal (new transfer).
    fn clear(&self);

    /// Monotonic milliseconds on the handle's own time base. Callers that
    /// wait more than once against one budget measure elapsed time with it.
    fn now_ms(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════════════════
// SPIN WAIT HANDLE (no_std)
// ═══════════════════════════════════════════════════════════════════════════

/// Busy-waiting handle for bare-metal builds, timed with a tick [`Clock`].
pub struct SpinWaitHandle<C: Clock> {
    signaled: AtomicBool,
    clock: C,
    timeouts: TimeoutConfig,
}

impl<C: Clock> SpinWaitHandle<C> {
    /// # Arguments
    /// - `clock`: free-running tick source
    /// - `tick_freq`: ticks per second of `clock`
    pub fn new(clock: C, tick_freq: u64) -> Self {
        Self {
            signaled: AtomicBool::new(false),
            clock,
            timeouts: TimeoutConfig::new(tick_freq),
        }
    }
}

impl<C: Clock> WaitHandle for SpinWaitHandle<C> {
    fn notify(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    fn wait(&self, timeout_ms: u32) -> bool {
        let deadline = Deadline::after_ms(&self.clock, &self.timeouts, timeout_ms as u64);
        loop {
            if self.signaled.swap(false, Ordering::AcqRel) {
                return true;
            }
            if deadline.expired(&self.clock) {
                return false;
            }
            core::hint::spin_loop();
        }
    }

    fn clear(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    fn now_ms(&self) -> u64 {
        self.timeouts.ticks_to_ms(self.clock.ticks())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONDVAR WAIT HANDLE (std)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(feature = "std")]
pub use self::hosted::CondvarWaitHandle;

#[cfg(feature = "std")]
mod hosted {
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    use super::WaitHandle;

    /// Sleeping handle for hosted builds.
    pub struct CondvarWaitHandle {
        signaled: Mutex<bool>,
        cv: Condvar,
        origin: Instant,
    }

    impl CondvarWaitHandle {
        pub fn new() -> Self {
            Self {
                signaled: Mutex::new(false),
                cv: Condvar::new(),
                origin: Instant::now(),
            }
        }
    }

    impl Default for CondvarWaitHandle {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WaitHandle for CondvarWaitHandle {
        fn notify(&self) {
            let mut signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
            *signaled = true;
            self.cv.notify_one();
        }

        fn wait(&self, timeout_ms: u32) -> bool {
            let guard = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
            let (mut signaled, _) = self
                .cv
                .wait_timeout_while(guard, Duration::from_millis(timeout_ms as u64), |s| !*s)
                .unwrap_or_else(|e| e.into_inner());
            let woke = *signaled;
            *signaled = false;
            woke
        }

        fn clear(&self) {
            *self.signaled.lock().unwrap_or_else(|e| e.into_inner()) = false;
        }

        fn now_ms(&self) -> u64 {
            self.origin.elapsed().as_millis() as u64
        }
    }
}
