use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{engine::ResubmissionSettings, retry::RetryPolicy};
use crate::config::ConfigError;

/// Settings for the history scan, the live watch, and response resubmission.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ResponderConfig {
    /// First block scanned for request events.
    pub start_block: u64,
    /// Maximum number of blocks per `eth_getLogs` window.
    pub block_range: u64,
    /// Delay between attempts at resolving a request.
    pub retry_delay_ms: u64,
    /// When set, the retry delay doubles per attempt up to this cap.
    #[serde(default)]
    pub max_retry_delay_ms: Option<u64>,
    /// How long to wait for a submitted response to be mined.
    pub inclusion_timeout_ms: u64,
    /// Priority fee increase applied when replacing a stuck response.
    pub acceleration_percent: u64,
    /// Smallest priority fee increase, in wei.
    pub min_priority_fee_bump_wei: u64,
    /// Poll interval of the live request filter.
    pub watch_poll_interval_ms: u64,
}

impl ResponderConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.block_range == 0 {
            return Err(ConfigError::InvalidConfig(
                "responder.block_range must be greater than 0".to_string(),
            ));
        }
        if self.retry_delay_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "responder.retry_delay_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(max) = self.max_retry_delay_ms
            && max < self.retry_delay_ms
        {
            return Err(ConfigError::InvalidConfig(format!(
                "responder.max_retry_delay_ms ({max}) is below retry_delay_ms ({})",
                self.retry_delay_ms
            )));
        }
        if self.inclusion_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "responder.inclusion_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.acceleration_percent == 0 {
            return Err(ConfigError::InvalidConfig(
                "responder.acceleration_percent must be greater than 0".to_string(),
            ));
        }
        if self.watch_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "responder.watch_poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.retry_delay_ms);
        match self.max_retry_delay_ms {
            Some(max) => RetryPolicy::Exponential {
                base,
                max: Duration::from_millis(max),
            },
            None => RetryPolicy::Fixed(base),
        }
    }

    pub(crate) fn resubmission_settings(&self) -> ResubmissionSettings {
        ResubmissionSettings {
            inclusion_timeout: Duration::from_millis(self.inclusion_timeout_ms),
            acceleration_percent: self.acceleration_percent,
            min_priority_fee_bump: u128::from(self.min_priority_fee_bump_wei),
        }
    }

    pub(crate) fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }
}
