use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Client-side cap on outgoing JSON-RPC requests. Unset means unthrottled.
pub(crate) struct RpcRateLimiter(Option<DefaultDirectRateLimiter>);

impl RpcRateLimiter {
    pub(crate) fn new(requests_per_second: Option<u32>) -> Self {
        Self(
            requests_per_second
                .and_then(NonZeroU32::new)
                .map(|rps| RateLimiter::direct(Quota::per_second(rps))),
        )
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) async fn acquire(&self) {
        if let Some(limiter) = &self.0 {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_or_zero_rate_never_blocks() {
        for limit in [None, Some(0)] {
            let limiter = RpcRateLimiter::new(limit);
            assert!(!limiter.is_enabled());
            limiter.acquire().await;
        }
    }

    #[tokio::test]
    async fn first_request_within_quota_passes() {
        let limiter = RpcRateLimiter::new(Some(5));
        assert!(limiter.is_enabled());
        limiter.acquire().await;
    }
}
