use alloy::{
    primitives::B256,
    providers::PendingTransactionError,
    signers::local::LocalSignerError,
    transports::{RpcError, TransportErrorKind},
};

#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    #[error("Contract error: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("RPC call '{operation}' failed: {source}")]
    Rpc {
        operation: &'static str,
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Failed to get logs for blocks {from_block}..={to_block}: {source}")]
    GetLogs {
        from_block: u64,
        to_block: u64,
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Failed to decode {event} log: {reason}")]
    Decode { event: &'static str, reason: String },

    #[error("Invalid private key (length: {key_length})")]
    InvalidPrivateKey {
        key_length: usize,
        #[source]
        source: LocalSignerError,
    },

    #[error("RPC connection failed after trying {attempts} endpoint(s)")]
    RpcConnectionFailed { attempts: usize },

    #[error("Provider initialization failed: {reason}")]
    ProviderInit { reason: String },

    #[error("Transaction simulation failed: {source}")]
    Simulation {
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Transaction submission failed: {source}")]
    Submission {
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Transaction receipt for {tx_hash} failed: {source}")]
    ReceiptFailed {
        tx_hash: B256,
        #[source]
        source: PendingTransactionError,
    },

    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: B256 },

    #[error("Fee estimation unavailable: {reason}")]
    FeeUnavailable { reason: String },

    #[error("{0}")]
    Custom(String),
}

impl BlockchainError {
    pub(crate) fn rpc(operation: &'static str) -> impl FnOnce(RpcError<TransportErrorKind>) -> Self {
        move |source| Self::Rpc { operation, source }
    }
}
