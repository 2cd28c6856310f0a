//! Scheduler shell: turns a polled timer into discrete tick events.

use tracing::trace;

use crate::timer::{MsTimer, TickTimer};

/// Default tick interval in milliseconds.
pub const DEFAULT_TASK_INTERVAL_MS: u32 = 1000;

/// Fixed-cadence tick source for the dispatcher.
///
/// The interval is chosen at construction and never changes afterwards.
#[derive(Debug, Clone)]
pub struct TaskScheduler<T = MsTimer> {
    timer: T,
    interval_ms: u32,
}

impl TaskScheduler<MsTimer> {
    /// Creates a scheduler on the monotonic clock with the default interval.
    pub fn new() -> Self {
        Self::with_timer(MsTimer::new(), DEFAULT_TASK_INTERVAL_MS)
    }
}

impl Default for TaskScheduler<MsTimer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TickTimer> TaskScheduler<T> {
    /// Creates a scheduler over `timer` that fires every `interval_ms`.
    ///
    /// The timer stays unarmed until [`start`](Self::start).
    pub fn with_timer(timer: T, interval_ms: u32) -> Self {
        Self { timer, interval_ms }
    }

    /// Arms (or re-arms) the timer so the next interval starts now.
    pub fn start(&mut self) {
        self.timer.set(self.interval_ms);
    }

    /// Checks for expiry.
    ///
    /// Returns `None` without touching any state while the interval is
    /// still running. On expiry the timer is reset first and the elapsed
    /// time is reported as the configured interval in whole seconds, not
    /// the measured wall-clock time.
    pub fn poll(&mut self) -> Option<u32> {
        if !self.timer.expired() {
            return None;
        }
        self.timer.reset();
        let elapsed_seconds = self.timer.interval() / 1000;
        trace!(elapsed_seconds, "periodic task due");
        Some(elapsed_seconds)
    }

    /// The configured interval in milliseconds.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// The underlying timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
