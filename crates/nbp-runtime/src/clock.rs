#![forbid(unsafe_code)]

//! Monotonic time sources.
//!
//! All presence timers are expressed as a [`Duration`] since an arbitrary
//! origin. Hosts either drive a [`DeterministicClock`] explicitly (tests,
//! `requestAnimationFrame` timestamps) or read a [`WebClock`].

use core::time::Duration;

use web_time::Instant;

/// A monotonic clock.
pub trait Clock {
    fn now_mono(&self) -> Duration;
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time. Moving backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl Clock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now
    }
}

/// Wall-clock backed monotonic time (works on `wasm32` through `web-time`).
#[derive(Debug, Clone, Copy)]
pub struct WebClock {
    origin: Instant,
}

impl WebClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WebClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WebClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Convert a host timestamp in milliseconds to a [`Duration`].
///
/// Rejects NaN, infinities, negative values, and values past `Duration::MAX`.
pub fn duration_from_ms(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(ms / 1000.0).ok()
}
