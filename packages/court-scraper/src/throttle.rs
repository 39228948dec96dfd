//! Request pacing shared by the search and enrichment clients.
//!
//! Uses the governor crate so the pipeline never bursts past the API's
//! per-second limits, independent of the per-run quota caps.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Cloneable handle to a shared request limiter.
#[derive(Clone)]
pub struct Throttle {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

impl Throttle {
    /// Allow `requests_per_second` sustained, no burst. Zero disables pacing.
    pub fn per_second(requests_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second).map(|rps| {
            let quota = Quota::per_second(rps).allow_burst(nonzero!(1u32));
            Arc::new(RateLimiter::direct(quota))
        });
        Self { limiter }
    }

    /// No pacing at all.
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Wait until one more request is allowed.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
