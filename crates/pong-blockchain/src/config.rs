use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Connection settings for the chain hosting the PingPong contract.
///
/// **Secret handling**: the operational private key is read from the config
/// file or the `EVM_OPERATIONAL_WALLET_PRIVATE_KEY` environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockchainConfigRaw {
    /// RPC endpoints for EVM JSON-RPC calls (HTTP or WebSocket).
    /// Multiple endpoints enable fallback if the primary fails.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,

    /// Address of the deployed PingPong contract.
    pub contract_address: String,

    /// Private key of the wallet that sends pong transactions.
    pub evm_operational_wallet_private_key: Option<String>,

    /// Maximum RPC requests per second. `None` disables rate limiting.
    pub max_rpc_requests_per_second: Option<u32>,
}

impl BlockchainConfigRaw {
    pub fn resolve(self) -> Result<BlockchainConfig, ConfigError> {
        if self.rpc_endpoints.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "rpc_endpoints must include at least one endpoint".to_string(),
            ));
        }

        if self.max_rpc_requests_per_second == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_rpc_requests_per_second must be greater than 0 when set".to_string(),
            ));
        }

        let contract_address: Address = self.contract_address.parse().map_err(|_| {
            ConfigError::InvalidConfig(format!(
                "invalid contract_address: {}",
                self.contract_address
            ))
        })?;

        let private_key = self.evm_operational_wallet_private_key.ok_or_else(|| {
            ConfigError::MissingSecret(
                "EVM_OPERATIONAL_WALLET_PRIVATE_KEY env var or evm_operational_wallet_private_key config required".to_string(),
            )
        })?;

        let signer: PrivateKeySigner = private_key.parse().map_err(|_| {
            ConfigError::InvalidConfig(format!(
                "invalid operational wallet private key (length: {})",
                private_key.len()
            ))
        })?;

        Ok(BlockchainConfig {
            rpc_endpoints: self.rpc_endpoints,
            contract_address,
            operational_wallet_address: signer.address(),
            evm_operational_wallet_private_key: private_key,
            max_rpc_requests_per_second: self.max_rpc_requests_per_second,
        })
    }
}

#[derive(Clone)]
pub struct BlockchainConfig {
    rpc_endpoints: Vec<String>,
    contract_address: Address,
    operational_wallet_address: Address,
    evm_operational_wallet_private_key: String,
    max_rpc_requests_per_second: Option<u32>,
}

impl std::fmt::Debug for BlockchainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainConfig")
            .field("rpc_endpoints", &self.rpc_endpoints)
            .field("contract_address", &self.contract_address)
            .field("operational_wallet_address", &self.operational_wallet_address)
            .field("max_rpc_requests_per_second", &self.max_rpc_requests_per_second)
            .finish_non_exhaustive()
    }
}

impl BlockchainConfig {
    pub fn rpc_endpoints(&self) -> &[String] {
        &self.rpc_endpoints
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn operational_wallet_address(&self) -> Address {
        self.operational_wallet_address
    }

    pub fn evm_operational_wallet_private_key(&self) -> &str {
        &self.evm_operational_wallet_private_key
    }

    pub fn max_rpc_requests_per_second(&self) -> Option<u32> {
        self.max_rpc_requests_per_second
    }
}
