//! Reconciliation and resubmission of responses.
//!
//! At startup the request history is joined with stored responses and every
//! request still owed a confirmed response is queued. A single worker then
//! drains the queue while a listener appends newly observed requests.

mod config;
mod engine;
mod listener;
mod ports;
mod queue;
mod range_fetcher;
mod reconciliation;
mod retry;

use std::sync::Arc;

pub(crate) use config::ResponderConfig;
pub(crate) use listener::listen_for_requests;
pub(crate) use ports::{Ledger, ResponseStore};
pub(crate) use queue::{DispatchQueue, DispatchReceiver, DispatchWorker};
use tokio_util::sync::CancellationToken;

use self::{
    engine::ResubmissionEngine,
    queue::DispatchTask,
    range_fetcher::RangeFetcher,
    reconciliation::build_reconciliation_map,
    retry::{RetryRunner, TokioSleeper},
};
use crate::error::ResponderError;

/// Wires the engine components around one ledger and one store.
pub(crate) struct Responder {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ResponseStore>,
    config: ResponderConfig,
}

impl Responder {
    pub(crate) fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ResponseStore>,
        config: ResponderConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            config,
        }
    }

    /// Scan history up to the current head and queue every request still
    /// owed a confirmed response, in discovery order. Returns the number of
    /// requests queued.
    pub(crate) async fn seed_backlog(&self, queue: &DispatchQueue) -> Result<usize, ResponderError> {
        let latest_block = self.ledger.latest_block().await?;
        let fetcher = RangeFetcher::new(Arc::clone(&self.ledger), self.config.block_range);
        let map = build_reconciliation_map(
            &fetcher,
            self.store.as_ref(),
            self.config.start_block,
            latest_block,
        )
        .await?;

        let mut queued = 0;
        for (request_id, record) in map.pending() {
            if queue.enqueue(DispatchTask::known(request_id, record)).await {
                queued += 1;
            }
        }

        tracing::info!(
            latest_block,
            requests = map.len(),
            backlog = queued,
            "Backlog queued"
        );
        Ok(queued)
    }

    pub(crate) fn worker(
        &self,
        receiver: DispatchReceiver,
        shutdown: CancellationToken,
    ) -> DispatchWorker {
        let engine = ResubmissionEngine::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.store),
            self.config.resubmission_settings(),
        );
        let runner = RetryRunner::new(
            engine,
            Arc::clone(&self.store),
            self.config.retry_policy(),
            Arc::new(TokioSleeper),
        );
        DispatchWorker::new(Arc::new(runner), receiver, shutdown)
    }

    pub(crate) fn store(&self) -> Arc<dyn ResponseStore> {
        Arc::clone(&self.store)
    }
}
