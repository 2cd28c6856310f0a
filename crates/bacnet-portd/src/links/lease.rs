//! Foreign device registration lease.
//!
//! A foreign device registers with a BBMD for a time-to-live and must
//! register again before the BBMD drops it from its foreign device table.

/// Countdown to the next registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignDeviceLease {
    ttl_seconds: u16,
    remaining_seconds: u16,
}

impl ForeignDeviceLease {
    /// Starts a lease right after a registration was sent.
    pub fn new(ttl_seconds: u16) -> Self {
        Self {
            ttl_seconds,
            remaining_seconds: ttl_seconds,
        }
    }

    /// Advances the countdown.
    ///
    /// Returns true when a renewal is due; the countdown then restarts
    /// from the time-to-live.
    pub fn tick(&mut self, elapsed_seconds: u32) -> bool {
        let elapsed = u16::try_from(elapsed_seconds).unwrap_or(u16::MAX);
        self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed);
        if self.remaining_seconds == 0 {
            self.remaining_seconds = self.ttl_seconds;
            return true;
        }
        false
    }

    pub fn ttl_seconds(&self) -> u16 {
        self.ttl_seconds
    }

    pub fn remaining_seconds(&self) -> u16 {
        self.remaining_seconds
    }
}
