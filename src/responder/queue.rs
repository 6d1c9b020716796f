use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use pong_blockchain::B256;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{
    ports::ResponseRecord,
    retry::{RetryOutcome, RetryRunner},
};

/// One request to bring to a confirmed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DispatchTask {
    pub request_id: B256,
    pub record: Option<ResponseRecord>,
    /// Read the record from the store before the first attempt instead of
    /// trusting `record`.
    pub refresh: bool,
}

impl DispatchTask {
    pub(crate) fn known(request_id: B256, record: Option<ResponseRecord>) -> Self {
        Self {
            request_id,
            record,
            refresh: false,
        }
    }

    pub(crate) fn refresh(request_id: B256) -> Self {
        Self {
            request_id,
            record: None,
            refresh: true,
        }
    }
}

#[async_trait]
pub(crate) trait DispatchHandler: Send + Sync {
    async fn handle(&self, task: DispatchTask, shutdown: &CancellationToken);
}

#[async_trait]
impl DispatchHandler for RetryRunner {
    async fn handle(&self, task: DispatchTask, shutdown: &CancellationToken) {
        if let RetryOutcome::Abandoned = self.run(task, shutdown).await {
            tracing::warn!(
                request_id = %task.request_id,
                "Request left unresolved at shutdown"
            );
        }
    }
}

/// Producer handle for the dispatch queue. Cheap to clone.
///
/// Ids stay registered from enqueue until their task has been handled, so
/// repeated deliveries of the same request collapse into one task.
#[derive(Clone)]
pub(crate) struct DispatchQueue {
    tx: mpsc::UnboundedSender<DispatchTask>,
    registered: Arc<Mutex<HashSet<B256>>>,
    shutdown: CancellationToken,
}

pub(crate) struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<DispatchTask>,
    registered: Arc<Mutex<HashSet<B256>>>,
}

#[cfg(test)]
impl DispatchReceiver {
    pub(crate) fn try_recv(&mut self) -> Result<DispatchTask, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

impl DispatchQueue {
    pub(crate) fn channel(shutdown: CancellationToken) -> (Self, DispatchReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registered = Arc::new(Mutex::new(HashSet::new()));
        (
            Self {
                tx,
                registered: Arc::clone(&registered),
                shutdown,
            },
            DispatchReceiver { rx, registered },
        )
    }

    /// Append to the tail. Returns `false` if the request is already queued
    /// or in progress, or if shutdown has started.
    pub(crate) async fn enqueue(&self, task: DispatchTask) -> bool {
        if self.shutdown.is_cancelled() {
            tracing::debug!(
                request_id = %task.request_id,
                "Shutdown in progress, not enqueueing request"
            );
            return false;
        }

        let mut registered = self.registered.lock().await;
        if !registered.insert(task.request_id) {
            tracing::debug!(request_id = %task.request_id, "Request already queued");
            return false;
        }

        if let Err(error) = self.tx.send(task) {
            registered.remove(&error.0.request_id);
            tracing::error!(
                request_id = %error.0.request_id,
                "Dispatch worker is gone; dropping request"
            );
            return false;
        }

        pong_observability::record_dispatch_queue_depth(registered.len());
        true
    }

    /// Requests queued or in progress.
    pub(crate) async fn len(&self) -> usize {
        self.registered.lock().await.len()
    }
}

/// Single consumer of the dispatch queue: handles one task at a time, in
/// FIFO order, each to completion before taking the next.
pub(crate) struct DispatchWorker {
    handler: Arc<dyn DispatchHandler>,
    receiver: DispatchReceiver,
    shutdown: CancellationToken,
}

impl DispatchWorker {
    pub(crate) fn new(
        handler: Arc<dyn DispatchHandler>,
        receiver: DispatchReceiver,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            handler,
            receiver,
            shutdown,
        }
    }

    /// Runs until shutdown is requested or every producer is dropped. A task
    /// in progress at shutdown is allowed to finish its current attempt.
    pub(crate) async fn run(mut self) {
        loop {
            let task = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                task = self.receiver.rx.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            tracing::debug!(request_id = %task.request_id, "Dispatching request");
            self.handler.handle(task, &self.shutdown).await;

            let mut registered = self.receiver.registered.lock().await;
            registered.remove(&task.request_id);
            pong_observability::record_dispatch_queue_depth(registered.len());
        }

        tracing::info!("Dispatch worker stopped");
    }
}
