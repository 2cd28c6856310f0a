//! Millisecond interval timer.
//!
//! Time is a free-running 32-bit millisecond counter that wraps after
//! about 49.7 days; all comparisons use wrapping subtraction so a timer
//! keeps working across the wrap.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of the current millisecond count.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> u32;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same counter, so a test can keep a handle while the
/// timer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    pub fn starting_at(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    /// Moves the clock forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Sets the absolute reading.
    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Interval timer driven by the scheduler shell.
pub trait TickTimer {
    /// Arms the timer with `interval_ms`, starting now.
    fn set(&mut self, interval_ms: u32);

    /// Returns true once the interval has elapsed since the last set/reset.
    /// An unarmed timer never expires.
    fn expired(&self) -> bool;

    /// Starts the next interval from now.
    fn reset(&mut self);

    /// The configured interval in milliseconds.
    fn interval(&self) -> u32;
}

/// [`TickTimer`] over any [`Clock`].
#[derive(Debug, Clone)]
pub struct MsTimer<C = MonotonicClock> {
    clock: C,
    start: u32,
    interval: u32,
    armed: bool,
}

impl MsTimer<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for MsTimer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MsTimer<C> {
    /// Creates an unarmed timer reading `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            start: 0,
            interval: 0,
            armed: false,
        }
    }

    /// Milliseconds since the last set/reset.
    pub fn elapsed(&self) -> u32 {
        self.clock.now_ms().wrapping_sub(self.start)
    }

    /// Returns true if the timer has been set at least once.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl<C: Clock> TickTimer for MsTimer<C> {
    fn set(&mut self, interval_ms: u32) {
        self.interval = interval_ms;
        self.start = self.clock.now_ms();
        self.armed = true;
    }

    fn expired(&self) -> bool {
        self.armed && self.elapsed() >= self.interval
    }

    fn reset(&mut self) {
        self.start = self.clock.now_ms();
    }

    fn interval(&self) -> u32 {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_never_expires() {
        let clock = ManualClock::default();
        let timer = MsTimer::with_clock(clock.clone());
        clock.advance(1_000_000);
        assert!(!timer.is_armed());
        assert!(!timer.expired());
    }

    #[test]
    fn test_expires_after_interval() {
        let clock = ManualClock::starting_at(500);
        let mut timer = MsTimer::with_clock(clock.clone());
        timer.set(1000);

        clock.advance(999);
        assert!(!timer.expired());
        clock.advance(1);
        assert!(timer.expired());
        assert_eq!(timer.interval(), 1000);
    }

    #[test]
    fn test_reset_starts_from_now() {
        let clock = ManualClock::default();
        let mut timer = MsTimer::with_clock(clock.clone());
        timer.set(1000);

        // Late by 700 ms; the next deadline is 1000 ms from the reset.
        clock.advance(1700);
        assert!(timer.expired());
        timer.reset();
        assert_eq!(timer.elapsed(), 0);

        clock.advance(999);
        assert!(!timer.expired());
        clock.advance(1);
        assert!(timer.expired());
    }

    #[test]
    fn test_wraparound() {
        let clock = ManualClock::starting_at(u32::MAX - 200);
        let mut timer = MsTimer::with_clock(clock.clone());
        timer.set(1000);

        clock.advance(500);
        assert!(!timer.expired());
        assert_eq!(timer.elapsed(), 500);
        clock.advance(500);
        assert!(timer.expired());
    }

    #[test]
    fn test_manual_clock_advances_from_clones_across_threads() {
        let clock = ManualClock::starting_at(u32::MAX - 99);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        clock.advance(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // 4000 ms past a start 100 ms short of the wrap
        assert_eq!(clock.now_ms(), 3900);
    }

    #[test]
    fn test_monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b.wrapping_sub(a) < 1000);
    }
}
