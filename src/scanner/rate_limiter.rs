//! Admission pacing for the scheduler.
//!
//! Token bucket limiting of how many probes may start per second. Disabled
//! unless a non-zero rate is configured.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// A shared probes-per-second limiter.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// Create a limiter admitting `rate` probes per second.
    ///
    /// Returns `None` for a rate of zero, meaning unlimited.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        Some(Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(rate))),
        })
    }

    /// Wait until the next admission is allowed.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token without waiting. Returns `false` if none is available.
    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
