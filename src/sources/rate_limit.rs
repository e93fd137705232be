//! Request pacing for the Wikimedia APIs

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Spaces requests at least `1 / requests_per_second` apart.
///
/// Clones share the same budget, so one limiter can be handed to every
/// client talking to the same host family.
#[derive(Clone)]
pub struct RequestLimiter {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let quota = if requests_per_second >= 1.0 {
            let rps = NonZeroU32::new(requests_per_second.round() as u32).unwrap_or(nonzero!(1u32));
            Quota::per_second(rps)
        } else {
            let period = Duration::from_secs_f64(1.0 / requests_per_second.max(0.001));
            Quota::with_period(period).unwrap_or_else(|| Quota::per_second(nonzero!(1u32)))
        };
        let quota = quota.allow_burst(nonzero!(1u32));

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        if self.limiter.check().is_err() {
            trace!("Rate limiting Wikimedia request");
            self.limiter.until_ready().await;
        }
    }
}
