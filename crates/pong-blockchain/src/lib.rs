mod chains;
mod config;
mod config_error;
mod error;
mod error_classification;
mod events;
mod gas;
mod rpc_executor;
mod rpc_rate_limiter;

pub use chains::evm::{
    EvmChain, InclusionReceipt, PingPong, PreparedResponse, RequestEventStream, TransactionLookup,
};
pub use config::{BlockchainConfig, BlockchainConfigRaw};
pub use config_error::ConfigError;
pub use error::BlockchainError;
pub use events::{EventKind, RequestEvent, ResponseEvent};
pub use gas::FeeEstimate;

pub use alloy::primitives::{Address, B256, U256};

/// Formats a native token amount (18 decimals) for logging.
pub fn format_ether(wei: U256) -> String {
    alloy::primitives::utils::format_ether(wei)
}
