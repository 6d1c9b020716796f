use std::time::Duration;

use alloy::transports::{RpcError, TransportErrorKind};

use crate::error_classification::{is_retryable_rpc_error, rpc_backoff_hint};

/// Short in-call retry for transient transport failures. Anything still
/// failing after `max_attempts` surfaces to the caller.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: usize,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn rpc_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }

    /// Delay before retry number `attempt` (1-based). A provider-supplied
    /// hint wins over the exponential schedule; both are capped.
    pub(crate) fn delay(&self, attempt: usize, hint: Option<Duration>) -> Duration {
        let scheduled = || {
            let shift = attempt.saturating_sub(1).min(16) as u32;
            self.base_delay.saturating_mul(1u32 << shift)
        };
        hint.unwrap_or_else(scheduled).min(self.max_delay)
    }
}

pub(crate) trait RetryableError: std::fmt::Display {
    fn is_retryable(&self) -> bool;

    fn backoff_hint(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for RpcError<TransportErrorKind> {
    fn is_retryable(&self) -> bool {
        is_retryable_rpc_error(self)
    }

    fn backoff_hint(&self) -> Option<Duration> {
        rpc_backoff_hint(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_capped() {
        let policy = RetryPolicy::rpc_default();
        let delays: Vec<_> = (1..=5).map(|n| policy.delay(n, None)).collect();
        assert_eq!(
            delays,
            [200, 400, 800, 1600, 2000].map(Duration::from_millis)
        );
        assert_eq!(policy.delay(usize::MAX, None), Duration::from_secs(2));
    }

    #[test]
    fn provider_hint_overrides_schedule_but_not_cap() {
        let policy = RetryPolicy::rpc_default();
        assert_eq!(
            policy.delay(3, Some(Duration::from_millis(50))),
            Duration::from_millis(50)
        );
        assert_eq!(
            policy.delay(1, Some(Duration::from_secs(30))),
            Duration::from_secs(2)
        );
    }
}
