mod contracts;
mod provider;
mod rpc;

use std::time::Instant;

use alloy::primitives::Address;
pub use contracts::PingPong;
use provider::{BlockchainProvider, initialize_provider};
pub use rpc::{
    events::RequestEventStream,
    transactions::{InclusionReceipt, PreparedResponse, TransactionLookup},
};

use crate::{
    BlockchainConfig,
    error::BlockchainError,
    rpc_executor::{RetryPolicy, RetryableError},
    rpc_rate_limiter::RpcRateLimiter,
};

const GAS_ESTIMATE_MULTIPLIER: f64 = 1.2;

pub struct EvmChain {
    config: BlockchainConfig,
    provider: BlockchainProvider,
    contract: PingPong::PingPongInstance<BlockchainProvider>,
    rpc_rate_limiter: RpcRateLimiter,
    rpc_retry_policy: RetryPolicy,
}

impl EvmChain {
    pub async fn new(config: BlockchainConfig) -> Result<Self, BlockchainError> {
        let provider =
            initialize_provider(&config)
                .await
                .map_err(|e| BlockchainError::ProviderInit {
                    reason: e.to_string(),
                })?;

        let contract = PingPong::new(config.contract_address(), provider.clone());

        let rpc_rate_limiter = RpcRateLimiter::new(config.max_rpc_requests_per_second());
        if rpc_rate_limiter.is_enabled() {
            tracing::info!(
                requests_per_second = config.max_rpc_requests_per_second(),
                "RPC throttling enabled"
            );
        }

        tracing::info!(
            contract = %config.contract_address(),
            wallet = %config.operational_wallet_address(),
            "Initialized PingPong chain client"
        );

        Ok(Self {
            config,
            provider,
            contract,
            rpc_rate_limiter,
            rpc_retry_policy: RetryPolicy::rpc_default(),
        })
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address()
    }

    pub fn operational_address(&self) -> Address {
        self.config.operational_wallet_address()
    }

    pub(crate) fn provider(&self) -> BlockchainProvider {
        self.provider.clone()
    }

    pub(crate) fn contract(&self) -> &PingPong::PingPongInstance<BlockchainProvider> {
        &self.contract
    }

    /// Runs one JSON-RPC call behind the throttle, retrying transient
    /// transport failures a few times before surfacing the error.
    pub(crate) async fn rpc_call<T, E, F, O>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, E>
    where
        E: RetryableError,
        F: FnMut() -> O,
        O: std::future::IntoFuture<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            self.rpc_rate_limiter.acquire().await;
            let started = Instant::now();
            let result = call().into_future().await;
            pong_observability::record_blockchain_rpc_call(
                operation,
                result.is_ok(),
                started.elapsed(),
            );
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.rpc_retry_policy.max_attempts || !err.is_retryable() {
                        return Err(err);
                    }

                    let delay = self.rpc_retry_policy.delay(attempt, err.backoff_hint());
                    tracing::debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Transient RPC failure, retrying"
                    );
                    pong_observability::record_blockchain_rpc_retry(operation);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn apply_gas_estimate_multiplier(estimate: u64) -> u64 {
    if estimate == 0 {
        return 0;
    }

    let scaled = (estimate as f64 * GAS_ESTIMATE_MULTIPLIER).ceil();
    if !scaled.is_finite() || scaled <= 0.0 {
        return estimate;
    }

    let scaled = scaled.min(u64::MAX as f64) as u64;
    scaled.max(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_multiplier_rounds_up_and_never_shrinks() {
        assert_eq!(apply_gas_estimate_multiplier(0), 0);
        assert_eq!(apply_gas_estimate_multiplier(21_000), 25_200);
        assert_eq!(apply_gas_estimate_multiplier(1), 2);
        assert_eq!(apply_gas_estimate_multiplier(u64::MAX), u64::MAX);
    }
}
