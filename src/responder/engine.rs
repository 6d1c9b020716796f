use std::{sync::Arc, time::Duration};

use pong_blockchain::{B256, FeeEstimate, TransactionLookup};

use super::ports::{Ledger, ResponseRecord, ResponseStore};
use crate::error::ResponderError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResubmissionSettings {
    pub inclusion_timeout: Duration,
    pub acceleration_percent: u64,
    pub min_priority_fee_bump: u128,
}

/// How a request ended up confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// First response sent and included.
    Sent,
    /// Stuck response replaced with a higher priority fee and included.
    Accelerated,
    /// Earlier response found included; only the record was updated.
    Confirmed,
    /// Earlier response was dropped or reverted; a new one was included.
    Resent,
    /// The record was already confirmed; nothing to do.
    AlreadyConfirmed,
}

impl Resolution {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Resolution::Sent => "sent",
            Resolution::Accelerated => "accelerated",
            Resolution::Confirmed => "confirmed",
            Resolution::Resent => "resent",
            Resolution::AlreadyConfirmed => "already_confirmed",
        }
    }
}

/// Decides and performs the next step that brings one request to a
/// confirmed response.
///
/// `resolve` may be called again after any failure; every path re-derives its
/// decision from the record and the ledger.
pub(crate) struct ResubmissionEngine {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ResponseStore>,
    settings: ResubmissionSettings,
}

impl ResubmissionEngine {
    pub(crate) fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ResponseStore>,
        settings: ResubmissionSettings,
    ) -> Self {
        Self {
            ledger,
            store,
            settings,
        }
    }

    pub(crate) async fn resolve(
        &self,
        request_id: B256,
        record: Option<ResponseRecord>,
    ) -> Result<Resolution, ResponderError> {
        let Some(record) = record else {
            self.respond(request_id, None, "new").await?;
            return Ok(Resolution::Sent);
        };

        if record.confirmed {
            tracing::warn!(
                request_id = %request_id,
                response_tx = %record.response_tx,
                "Request already has a confirmed response; skipping"
            );
            return Ok(Resolution::AlreadyConfirmed);
        }

        match self.ledger.lookup_transaction(record.response_tx).await? {
            TransactionLookup::Included { block_number } => {
                self.confirm(request_id, record.response_tx).await?;
                tracing::info!(
                    request_id = %request_id,
                    response_tx = %record.response_tx,
                    block_number,
                    "Earlier response was included"
                );
                Ok(Resolution::Confirmed)
            }
            TransactionLookup::Pending => {
                let quote = self.ledger.estimate_fees().await?;
                let fees = quote.accelerate(
                    self.settings.acceleration_percent,
                    self.settings.min_priority_fee_bump,
                );
                tracing::info!(
                    request_id = %request_id,
                    stuck_tx = %record.response_tx,
                    priority_fee = quote.max_priority_fee_per_gas,
                    accelerated_priority_fee = fees.max_priority_fee_per_gas,
                    max_fee = fees.max_fee_per_gas,
                    "Response is stuck; accelerating"
                );
                self.respond(request_id, Some(fees), "accelerated").await?;
                Ok(Resolution::Accelerated)
            }
            TransactionLookup::Reverted { block_number } => {
                tracing::warn!(
                    request_id = %request_id,
                    reverted_tx = %record.response_tx,
                    block_number,
                    "Earlier response reverted; sending a new one"
                );
                self.respond(request_id, None, "resent").await?;
                Ok(Resolution::Resent)
            }
            TransactionLookup::NotFound => {
                tracing::warn!(
                    request_id = %request_id,
                    dropped_tx = %record.response_tx,
                    "Earlier response is unknown to the network; sending a new one"
                );
                self.respond(request_id, None, "resent").await?;
                Ok(Resolution::Resent)
            }
        }
    }

    /// Submit, persist as unconfirmed, wait for inclusion, persist as confirmed.
    async fn respond(
        &self,
        request_id: B256,
        fees: Option<FeeEstimate>,
        kind: &'static str,
    ) -> Result<(), ResponderError> {
        let response_tx = self.ledger.submit_response(request_id, fees).await?;
        pong_observability::record_response_submission(kind);
        tracing::info!(
            request_id = %request_id,
            response_tx = %response_tx,
            kind,
            "Submitted response"
        );

        self.store.upsert_response(request_id, response_tx).await?;

        let receipt = self
            .ledger
            .wait_for_inclusion(response_tx, self.settings.inclusion_timeout)
            .await?;
        if !receipt.answered.contains(&request_id) {
            tracing::warn!(
                request_id = %request_id,
                response_tx = %response_tx,
                answered = ?receipt.answered,
                "Receipt does not reference the request"
            );
        }

        self.confirm(request_id, response_tx).await?;
        tracing::info!(
            request_id = %request_id,
            response_tx = %response_tx,
            block_number = ?receipt.block_number,
            "Response confirmed"
        );

        Ok(())
    }

    async fn confirm(&self, request_id: B256, response_tx: B256) -> Result<(), ResponderError> {
        let updated = self.store.set_confirmed(response_tx, true).await?;
        if updated == 0 {
            tracing::warn!(
                request_id = %request_id,
                response_tx = %response_tx,
                "No stored record matched the confirmed response"
            );
        }
        Ok(())
    }
}
