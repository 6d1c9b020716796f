//! Seams between the engine and its two collaborators, the ledger and the
//! durable response store. Production code plugs in [`EvmChain`] and
//! [`PongResponseRepository`]; tests plug in in-memory fakes.

use std::time::Duration;

use alloy::primitives::hex;
use async_trait::async_trait;
use pong_blockchain::{
    B256, BlockchainError, EvmChain, FeeEstimate, InclusionReceipt, RequestEvent,
    TransactionLookup,
};
use pong_repository::{PongResponseEntry, PongResponseRepository};

use crate::error::ResponderError;

/// Persisted answer to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResponseRecord {
    pub request_id: B256,
    pub response_tx: B256,
    pub confirmed: bool,
}

impl TryFrom<PongResponseEntry> for ResponseRecord {
    type Error = ResponderError;

    fn try_from(entry: PongResponseEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: parse_hash("request_tx", &entry.request_tx)?,
            response_tx: parse_hash("response_tx", &entry.response_tx)?,
            confirmed: entry.confirmed,
        })
    }
}

fn parse_hash(field: &'static str, value: &str) -> Result<B256, ResponderError> {
    value
        .parse::<B256>()
        .map_err(|_| ResponderError::InvalidRecord {
            field,
            value: value.to_string(),
        })
}

/// Rows whose hashes do not parse can never match a request. They are
/// skipped like orphans instead of failing the whole listing.
fn parse_stored_entries(entries: Vec<PongResponseEntry>) -> Vec<ResponseRecord> {
    let mut skipped = 0;
    let records = entries
        .into_iter()
        .filter_map(|entry| match ResponseRecord::try_from(entry) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(error = %error, "Skipping malformed response record");
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        pong_observability::record_malformed_records(skipped);
    }
    records
}

#[async_trait]
pub(crate) trait Ledger: Send + Sync {
    async fn latest_block(&self) -> Result<u64, BlockchainError>;

    async fn request_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RequestEvent>, BlockchainError>;

    /// Build, simulate and broadcast the response to `request_id`. `fees`
    /// replaces the pending transaction from the same wallet.
    async fn submit_response(
        &self,
        request_id: B256,
        fees: Option<FeeEstimate>,
    ) -> Result<B256, BlockchainError>;

    async fn wait_for_inclusion(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<InclusionReceipt, BlockchainError>;

    async fn lookup_transaction(&self, tx_hash: B256)
    -> Result<TransactionLookup, BlockchainError>;

    async fn estimate_fees(&self) -> Result<FeeEstimate, BlockchainError>;
}

#[async_trait]
pub(crate) trait ResponseStore: Send + Sync {
    async fn upsert_response(
        &self,
        request_id: B256,
        response_tx: B256,
    ) -> Result<ResponseRecord, ResponderError>;

    /// Returns the number of records updated.
    async fn set_confirmed(&self, response_tx: B256, confirmed: bool)
    -> Result<u64, ResponderError>;

    /// All records, oldest first.
    async fn list_responses(&self) -> Result<Vec<ResponseRecord>, ResponderError>;

    async fn get_response(&self, request_id: B256)
    -> Result<Option<ResponseRecord>, ResponderError>;
}

#[async_trait]
impl Ledger for EvmChain {
    async fn latest_block(&self) -> Result<u64, BlockchainError> {
        self.get_block_number().await
    }

    async fn request_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RequestEvent>, BlockchainError> {
        self.get_request_events(from_block, to_block).await
    }

    async fn submit_response(
        &self,
        request_id: B256,
        fees: Option<FeeEstimate>,
    ) -> Result<B256, BlockchainError> {
        let prepared = self.prepare_response(request_id, fees).await?;
        EvmChain::submit_response(self, prepared).await
    }

    async fn wait_for_inclusion(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<InclusionReceipt, BlockchainError> {
        EvmChain::wait_for_inclusion(self, tx_hash, timeout).await
    }

    async fn lookup_transaction(
        &self,
        tx_hash: B256,
    ) -> Result<TransactionLookup, BlockchainError> {
        EvmChain::lookup_transaction(self, tx_hash).await
    }

    async fn estimate_fees(&self) -> Result<FeeEstimate, BlockchainError> {
        EvmChain::estimate_fees(self).await
    }
}

#[async_trait]
impl ResponseStore for PongResponseRepository {
    async fn upsert_response(
        &self,
        request_id: B256,
        response_tx: B256,
    ) -> Result<ResponseRecord, ResponderError> {
        let entry = PongResponseRepository::upsert_response(
            self,
            &hex::encode_prefixed(request_id),
            &hex::encode_prefixed(response_tx),
        )
        .await?;
        ResponseRecord::try_from(entry)
    }

    async fn set_confirmed(
        &self,
        response_tx: B256,
        confirmed: bool,
    ) -> Result<u64, ResponderError> {
        Ok(
            PongResponseRepository::set_confirmed(self, &hex::encode_prefixed(response_tx), confirmed)
                .await?,
        )
    }

    async fn list_responses(&self) -> Result<Vec<ResponseRecord>, ResponderError> {
        Ok(parse_stored_entries(
            PongResponseRepository::list_responses(self).await?,
        ))
    }

    async fn get_response(
        &self,
        request_id: B256,
    ) -> Result<Option<ResponseRecord>, ResponderError> {
        PongResponseRepository::get_response(self, &hex::encode_prefixed(request_id))
            .await?
            .map(ResponseRecord::try_from)
            .transpose()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborators shared by the responder tests.

    #![allow(clippy::unwrap_used)]

    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use super::*;

    pub(crate) fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    pub(crate) fn request(byte: u8, block_number: u64) -> RequestEvent {
        RequestEvent {
            id: hash(byte),
            block_number,
            log_index: 0,
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Submission {
        pub request_id: B256,
        pub tx_hash: B256,
        pub fees: Option<FeeEstimate>,
    }

    #[derive(Default)]
    struct LedgerState {
        latest_block: u64,
        events: Vec<RequestEvent>,
        lookups: HashMap<B256, TransactionLookup>,
        fees: Option<FeeEstimate>,
        submissions: Vec<Submission>,
        failures: VecDeque<BlockchainError>,
        failed_waits: VecDeque<TransactionLookup>,
        next_tx: u8,
        log_queries: Vec<(u64, u64)>,
        undecodable_at: Option<u64>,
    }

    /// Ledger fake. Submitted transactions are included as soon as they are
    /// waited on, unless a failed wait is queued; queued submission failures
    /// are returned by the next submission.
    #[derive(Default)]
    pub(crate) struct FakeLedger {
        state: Mutex<LedgerState>,
    }

    impl FakeLedger {
        pub(crate) fn new() -> Self {
            let ledger = Self::default();
            ledger.state.lock().unwrap().next_tx = 0xE0;
            ledger
        }

        pub(crate) fn with_events(self, latest_block: u64, events: Vec<RequestEvent>) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                state.latest_block = latest_block;
                state.events = events;
            }
            self
        }

        /// Any log query covering `block_number` fails to decode.
        pub(crate) fn with_undecodable_log_at(self, block_number: u64) -> Self {
            self.state.lock().unwrap().undecodable_at = Some(block_number);
            self
        }

        pub(crate) fn with_fees(self, fees: FeeEstimate) -> Self {
            self.state.lock().unwrap().fees = Some(fees);
            self
        }

        pub(crate) fn with_lookup(self, tx_hash: B256, lookup: TransactionLookup) -> Self {
            self.state.lock().unwrap().lookups.insert(tx_hash, lookup);
            self
        }

        pub(crate) fn fail_next_submission(&self, error: BlockchainError) {
            self.state.lock().unwrap().failures.push_back(error);
        }

        /// The next inclusion wait fails and the waited transaction is then
        /// reported as `lookup_after`. A `Reverted` lookup fails the wait
        /// with a revert, anything else with a timeout.
        pub(crate) fn fail_next_wait(&self, lookup_after: TransactionLookup) {
            self.state.lock().unwrap().failed_waits.push_back(lookup_after);
        }

        pub(crate) fn submissions(&self) -> Vec<Submission> {
            self.state.lock().unwrap().submissions.clone()
        }

        pub(crate) fn log_queries(&self) -> Vec<(u64, u64)> {
            self.state.lock().unwrap().log_queries.clone()
        }
    }

    #[async_trait]
    impl Ledger for FakeLedger {
        async fn latest_block(&self) -> Result<u64, BlockchainError> {
            Ok(self.state.lock().unwrap().latest_block)
        }

        async fn request_events(
            &self,
            from_block: u64,
            to_block: u64,
        ) -> Result<Vec<RequestEvent>, BlockchainError> {
            // Yield so concurrently issued windows interleave.
            tokio::task::yield_now().await;
            let mut state = self.state.lock().unwrap();
            state.log_queries.push((from_block, to_block));
            if let Some(block) = state.undecodable_at
                && (from_block..=to_block).contains(&block)
            {
                return Err(BlockchainError::Decode {
                    event: "Ping",
                    reason: format!("malformed log in block {block}"),
                });
            }
            Ok(state
                .events
                .iter()
                .filter(|event| (from_block..=to_block).contains(&event.block_number))
                .copied()
                .collect())
        }

        async fn submit_response(
            &self,
            request_id: B256,
            fees: Option<FeeEstimate>,
        ) -> Result<B256, BlockchainError> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.failures.pop_front() {
                return Err(error);
            }
            let tx_hash = hash(state.next_tx);
            state.next_tx = state.next_tx.wrapping_add(1);
            state.submissions.push(Submission {
                request_id,
                tx_hash,
                fees,
            });
            Ok(tx_hash)
        }

        async fn wait_for_inclusion(
            &self,
            tx_hash: B256,
            _timeout: Duration,
        ) -> Result<InclusionReceipt, BlockchainError> {
            let mut state = self.state.lock().unwrap();
            if let Some(lookup_after) = state.failed_waits.pop_front() {
                state.lookups.insert(tx_hash, lookup_after);
                return Err(match lookup_after {
                    TransactionLookup::Reverted { .. } => {
                        BlockchainError::TransactionReverted { tx_hash }
                    }
                    _ => BlockchainError::Custom(format!("timed out waiting for {tx_hash}")),
                });
            }
            let answered = state
                .submissions
                .iter()
                .filter(|submission| submission.tx_hash == tx_hash)
                .map(|submission| submission.request_id)
                .collect();
            Ok(InclusionReceipt {
                tx_hash,
                block_number: Some(state.latest_block + 1),
                answered,
            })
        }

        async fn lookup_transaction(
            &self,
            tx_hash: B256,
        ) -> Result<TransactionLookup, BlockchainError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .lookups
                .get(&tx_hash)
                .copied()
                .unwrap_or(TransactionLookup::NotFound))
        }

        async fn estimate_fees(&self) -> Result<FeeEstimate, BlockchainError> {
            self.state
                .lock()
                .unwrap()
                .fees
                .ok_or_else(|| BlockchainError::FeeUnavailable {
                    reason: "no quote configured".to_string(),
                })
        }
    }

    /// Store fake keeping records in insertion order.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        records: Mutex<Vec<ResponseRecord>>,
        reads: Mutex<usize>,
    }

    impl MemoryStore {
        pub(crate) fn with_records(records: Vec<ResponseRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                reads: Mutex::new(0),
            }
        }

        pub(crate) fn records(&self) -> Vec<ResponseRecord> {
            self.records.lock().unwrap().clone()
        }

        pub(crate) fn reads(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    #[async_trait]
    impl ResponseStore for MemoryStore {
        async fn upsert_response(
            &self,
            request_id: B256,
            response_tx: B256,
        ) -> Result<ResponseRecord, ResponderError> {
            let mut records = self.records.lock().unwrap();
            let record = ResponseRecord {
                request_id,
                response_tx,
                confirmed: false,
            };
            match records.iter_mut().find(|r| r.request_id == request_id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            Ok(record)
        }

        async fn set_confirmed(
            &self,
            response_tx: B256,
            confirmed: bool,
        ) -> Result<u64, ResponderError> {
            let mut updated = 0;
            for record in self.records.lock().unwrap().iter_mut() {
                if record.response_tx == response_tx {
                    record.confirmed = confirmed;
                    updated += 1;
                }
            }
            Ok(updated)
        }

        async fn list_responses(&self) -> Result<Vec<ResponseRecord>, ResponderError> {
            Ok(self.records())
        }

        async fn get_response(
            &self,
            request_id: B256,
        ) -> Result<Option<ResponseRecord>, ResponderError> {
            *self.reads.lock().unwrap() += 1;
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.request_id == request_id)
                .copied())
        }
    }
}
