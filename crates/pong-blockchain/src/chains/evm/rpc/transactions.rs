use std::time::{Duration, Instant};

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::B256,
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::TransactionRequest,
};

use crate::{
    FeeEstimate, ResponseEvent,
    chains::evm::{EvmChain, apply_gas_estimate_multiplier},
    error::BlockchainError,
    error_classification::is_transaction_not_found,
};

/// A simulated `pong(bytes32)` transaction ready to be signed and sent.
#[derive(Debug, Clone)]
pub struct PreparedResponse {
    request_id: B256,
    tx: TransactionRequest,
}

/// What the network knows about a previously sent transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionLookup {
    Included { block_number: u64 },
    /// Mined with a failed status. The request is still unanswered.
    Reverted { block_number: u64 },
    Pending,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// Request ids referenced by `Pong` logs in the receipt.
    pub answered: Vec<B256>,
}

impl EvmChain {
    /// Build and simulate the response to `request_id`.
    ///
    /// With `fees`, the transaction replaces whatever the wallet has pending:
    /// it takes the latest mined nonce and the given EIP-1559 fees. Without,
    /// nonce and fees are left to the provider fillers.
    pub async fn prepare_response(
        &self,
        request_id: B256,
        fees: Option<FeeEstimate>,
    ) -> Result<PreparedResponse, BlockchainError> {
        let from = self.operational_address();
        let mut tx = self
            .contract()
            .pong(request_id)
            .from(from)
            .into_transaction_request();

        if let Some(fees) = fees {
            let nonce = self
                .rpc_call("get_transaction_count", || async {
                    self.provider().get_transaction_count(from).latest().await
                })
                .await
                .map_err(BlockchainError::rpc("get_transaction_count"))?;

            tx = tx
                .with_nonce(nonce)
                .with_max_fee_per_gas(fees.max_fee_per_gas)
                .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        }

        self.rpc_call("eth_call", || {
            let tx = tx.clone();
            async move { self.provider().call(tx).await }
        })
        .await
        .map_err(|source| BlockchainError::Simulation { source })?;

        let gas = self
            .rpc_call("estimate_gas", || {
                let tx = tx.clone();
                async move { self.provider().estimate_gas(tx).await }
            })
            .await
            .map_err(|source| BlockchainError::Simulation { source })?;

        Ok(PreparedResponse {
            request_id,
            tx: tx.with_gas_limit(apply_gas_estimate_multiplier(gas)),
        })
    }

    /// Sign and broadcast a prepared response. Not retried here: a blind
    /// resend could broadcast a second transaction with a fresh nonce.
    pub async fn submit_response(&self, prepared: PreparedResponse) -> Result<B256, BlockchainError> {
        self.rpc_rate_limiter.acquire().await;
        tracing::debug!(
            request_id = %prepared.request_id,
            nonce = ?prepared.tx.nonce,
            "Broadcasting response"
        );
        let started = Instant::now();

        let sent = self.provider().send_transaction(prepared.tx).await;
        pong_observability::record_blockchain_rpc_call(
            "send_transaction",
            sent.is_ok(),
            started.elapsed(),
        );

        sent.map(|pending| *pending.tx_hash())
            .map_err(|source| BlockchainError::Submission { source })
    }

    /// Block until `tx_hash` is mined or `timeout` elapses.
    pub async fn wait_for_inclusion(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<InclusionReceipt, BlockchainError> {
        let started = Instant::now();
        let receipt = PendingTransactionBuilder::new(self.provider().root().clone(), tx_hash)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await;

        pong_observability::record_blockchain_rpc_call(
            "wait_for_receipt",
            receipt.is_ok(),
            started.elapsed(),
        );
        let receipt =
            receipt.map_err(|source| BlockchainError::ReceiptFailed { tx_hash, source })?;

        if !ReceiptResponse::status(&receipt) {
            return Err(BlockchainError::TransactionReverted { tx_hash });
        }

        let answered = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == self.contract_address())
            .filter_map(|log| ResponseEvent::from_log(log).ok())
            .map(|event| event.tx_hash)
            .collect();

        Ok(InclusionReceipt {
            tx_hash,
            block_number: ReceiptResponse::block_number(&receipt),
            answered,
        })
    }

    pub async fn lookup_transaction(
        &self,
        tx_hash: B256,
    ) -> Result<TransactionLookup, BlockchainError> {
        let result = self
            .rpc_call("get_transaction_by_hash", || async {
                self.provider().get_transaction_by_hash(tx_hash).await
            })
            .await;

        let tx = match result {
            Ok(Some(tx)) => tx,
            Ok(None) => return Ok(TransactionLookup::NotFound),
            Err(err) if is_transaction_not_found(&err) => return Ok(TransactionLookup::NotFound),
            Err(err) => return Err(BlockchainError::rpc("get_transaction_by_hash")(err)),
        };
        let Some(block_number) = tx.block_number else {
            return Ok(TransactionLookup::Pending);
        };

        let receipt = self
            .rpc_call("get_transaction_receipt", || async {
                self.provider().get_transaction_receipt(tx_hash).await
            })
            .await
            .map_err(BlockchainError::rpc("get_transaction_receipt"))?;

        // A mined transaction whose receipt is not served yet is re-checked
        // on the next attempt.
        Ok(match receipt {
            Some(receipt) if ReceiptResponse::status(&receipt) => {
                TransactionLookup::Included { block_number }
            }
            Some(_) => TransactionLookup::Reverted { block_number },
            None => TransactionLookup::Pending,
        })
    }
}
