//! Global outbound request rate gate.
//!
//! The CRM enforces a strict request budget, so every outbound call, from
//! any endpoint or worker, funnels through one [`RateLimiter`]. The limiter
//! is a min-interval gate, not a token bucket: bursts are exactly what the
//! server-side budget forbids, so no two dispatches may be closer together
//! than `1 / ceiling` seconds.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Suspending gate that spaces dispatches at least `1 / ceiling` apart.
///
/// Shared state is the next free dispatch slot; reserving a slot is a
/// single critical section, and the wait happens outside it so concurrent
/// callers queue up without holding the lock.
pub struct RateLimiter {
    next_slot: Mutex<Option<Instant>>,
    interval: Duration,
}

impl RateLimiter {
    /// Create a limiter for `requests_per_second` (must be positive;
    /// validated at config load).
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            next_slot: Mutex::new(None),
            interval: Duration::from_secs_f64(1.0 / requests_per_second),
        }
    }

    /// Suspend until dispatching a request would not violate the ceiling.
    ///
    /// No error conditions; purely a scheduling gate.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |s| s.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    /// The minimum spacing between dispatches.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
