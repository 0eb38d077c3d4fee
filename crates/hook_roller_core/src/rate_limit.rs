//! Pacing policies for webhook creation.
//!
//! The provisioner asks its [`RateLimiter`] for permission before every
//! repository, so the pacing strategy can be swapped without touching the
//! orchestration.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;

/// Decides how long to wait before the next API call.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Waits until the next call may be made.
    async fn acquire(&self);
}

/// Keeps at least `interval` between the start of two successive calls.
///
/// The first call goes out immediately. A call that comes late is let through
/// at once and the next one is spaced a full interval after it.
#[derive(Debug)]
pub struct FixedInterval {
    interval: Duration,
    ticker: Mutex<Option<Interval>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateLimiter for FixedInterval {
    async fn acquire(&self) {
        let mut ticker = self.ticker.lock().await;
        // Created on first use, the timer needs a running runtime.
        let ticker = ticker.get_or_insert_with(|| {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let start = Instant::now();
        ticker.tick().await;

        let waited = start.elapsed();
        if !waited.is_zero() {
            debug!(wait_ms = waited.as_millis() as u64, "Paced next request");
        }
    }
}

/// Never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unpaced;

#[async_trait]
impl RateLimiter for Unpaced {
    async fn acquire(&self) {}
}

/// Picks the limiter for a configured interval; a zero interval means no pacing.
pub fn limiter_for_interval(interval: Duration) -> Box<dyn RateLimiter> {
    if interval.is_zero() {
        Box::new(Unpaced)
    } else {
        Box::new(FixedInterval::new(interval))
    }
}
