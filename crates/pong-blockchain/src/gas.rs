//! EIP-1559 fee quotes and the acceleration rule used when a response
//! transaction is stuck in the mempool.

use alloy::{eips::eip1559::Eip1559Estimation, providers::Provider};

use crate::{EvmChain, error::BlockchainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl FeeEstimate {
    /// Raise the priority fee by `percent`, by at least `min_bump` wei.
    ///
    /// The max fee is lifted when needed so it never falls below the new
    /// priority fee, which nodes would reject.
    pub fn accelerate(&self, percent: u64, min_bump: u128) -> Self {
        let tip = self.max_priority_fee_per_gas;
        let increase = tip.saturating_mul(u128::from(percent)) / 100;
        let increase = increase.max(min_bump.max(1));
        let max_priority_fee_per_gas = tip.saturating_add(increase);

        Self {
            max_fee_per_gas: self.max_fee_per_gas.max(max_priority_fee_per_gas),
            max_priority_fee_per_gas,
        }
    }
}

impl TryFrom<Eip1559Estimation> for FeeEstimate {
    type Error = BlockchainError;

    fn try_from(estimate: Eip1559Estimation) -> Result<Self, Self::Error> {
        if estimate.max_fee_per_gas == 0 || estimate.max_priority_fee_per_gas == 0 {
            return Err(BlockchainError::FeeUnavailable {
                reason: format!(
                    "provider returned empty quote (max_fee={}, priority_fee={})",
                    estimate.max_fee_per_gas, estimate.max_priority_fee_per_gas
                ),
            });
        }

        Ok(Self {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }
}

impl EvmChain {
    pub async fn estimate_fees(&self) -> Result<FeeEstimate, BlockchainError> {
        let estimate = self
            .rpc_call("estimate_eip1559_fees", || async {
                self.provider().estimate_eip1559_fees().await
            })
            .await
            .map_err(|e| BlockchainError::FeeUnavailable {
                reason: e.to_string(),
            })?;

        FeeEstimate::try_from(estimate)
    }
}
