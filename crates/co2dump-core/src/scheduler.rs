//! Polling interval timing
//!
//! Time comes from a free-running microsecond counter that wraps at `u32::MAX`
//! (about 71 minutes). Elapsed time is always computed with wrapping
//! subtraction, so a single wrap between two polls is harmless.

/// Free-running microsecond counter since boot
pub trait Clock {
    fn now_micros(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Decides when the next broadcast request is due
#[derive(Debug, Clone, Copy)]
pub struct PollTimer {
    interval_us: u32,
    last_request_us: u32,
}

impl PollTimer {
    /// Starts timing at `now_us`; the first request is due one interval later.
    pub const fn new(interval_us: u32, now_us: u32) -> Self {
        Self {
            interval_us,
            last_request_us: now_us,
        }
    }

    /// Returns `true` once more than one interval has passed since the last
    /// request, and restarts the interval at `now_us`.
    pub fn poll(&mut self, now_us: u32) -> bool {
        if self.elapsed(now_us) > self.interval_us {
            self.last_request_us = now_us;
            true
        } else {
            false
        }
    }

    pub fn elapsed(&self, now_us: u32) -> u32 {
        now_us.wrapping_sub(self.last_request_us)
    }

    pub const fn interval_us(&self) -> u32 {
        self.interval_us
    }
}
