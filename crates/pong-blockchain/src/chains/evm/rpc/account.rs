use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
};

use crate::{chains::evm::EvmChain, error::BlockchainError};

impl EvmChain {
    /// Native balance of the operational wallet.
    pub async fn get_balance(&self) -> Result<U256, BlockchainError> {
        let address = self.operational_address();
        self.rpc_call("get_balance", || async {
            self.provider().get_balance(address).await
        })
        .await
        .map_err(BlockchainError::rpc("get_balance"))
    }

    /// Address the contract last recorded as pinger.
    pub async fn pinger(&self) -> Result<Address, BlockchainError> {
        self.rpc_rate_limiter.acquire().await;
        Ok(self.contract().pinger().call().await?)
    }

    /// Simulate and send `ping()` from the operational wallet.
    pub async fn send_ping(&self) -> Result<B256, BlockchainError> {
        let call = self.contract().ping().from(self.operational_address());
        call.call().await?;

        self.rpc_rate_limiter.acquire().await;
        let pending = call.send().await?;

        Ok(*pending.tx_hash())
    }
}
