use std::sync::Arc;

use futures::{Stream, StreamExt};
use pong_blockchain::RequestEvent;
use tokio_util::sync::CancellationToken;

use super::{
    ports::ResponseStore,
    queue::{DispatchQueue, DispatchTask},
};

/// Forwards live request events into the dispatch queue. Never resolves
/// requests itself.
pub(crate) async fn listen_for_requests<S>(
    mut events: S,
    store: Arc<dyn ResponseStore>,
    queue: DispatchQueue,
    shutdown: CancellationToken,
) where
    S: Stream<Item = Vec<RequestEvent>> + Unpin + Send,
{
    tracing::info!("Watching for new requests");

    loop {
        let batch = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            batch = events.next() => match batch {
                Some(batch) => batch,
                None => {
                    tracing::warn!("Request event stream ended");
                    break;
                }
            },
        };

        for event in batch {
            // The read only filters out answered requests. The worker may
            // answer this request between the read and the enqueue, so the
            // task carries no record and the worker reads it again.
            match store.get_response(event.id).await {
                Ok(Some(record)) if record.confirmed => {
                    tracing::debug!(request_id = %event.id, "Request already answered");
                    continue;
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(
                    request_id = %event.id,
                    error = %error,
                    "Failed to read response record; deferring to the worker"
                ),
            }

            if queue.enqueue(DispatchTask::refresh(event.id)).await {
                tracing::info!(
                    request_id = %event.id,
                    block_number = event.block_number,
                    "Queued new request"
                );
            }
        }
    }

    tracing::info!("Request listener stopped");
}
