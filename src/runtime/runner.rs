use tokio::{select, signal::unix::SignalKind};
use tokio_util::sync::CancellationToken;

use super::{RuntimeDeps, shutdown};
use crate::{
    error::AppError,
    responder::{DispatchQueue, listen_for_requests},
};

pub(crate) async fn run(deps: RuntimeDeps) -> Result<(), AppError> {
    let RuntimeDeps {
        chain,
        responder,
        watch_poll_interval,
    } = deps;

    let shutdown_token = CancellationToken::new();
    let (queue, receiver) = DispatchQueue::channel(shutdown_token.clone());

    // Install the live filter before the history scan so requests mined
    // while scanning are delivered by the watcher; the queue drops repeats.
    let events = chain.watch_request_events(watch_poll_interval).await?;

    responder.seed_backlog(&queue).await?;

    let worker_task = tokio::task::spawn(responder.worker(receiver, shutdown_token.clone()).run());
    let mut listener_task = tokio::task::spawn(listen_for_requests(
        events,
        responder.store(),
        queue.clone(),
        shutdown_token.clone(),
    ));

    // Wait for shutdown signal (SIGINT or SIGTERM)
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;

    let listener_lost = select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, initiating shutdown...");
            false
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
            false
        }
        _ = &mut listener_task => {
            tracing::error!("Request listener exited; shutting down so a restart can rescan");
            true
        }
    };

    tracing::info!(queued = queue.len().await, "Stopping responder");

    shutdown::graceful_shutdown(shutdown::ShutdownContext {
        shutdown: shutdown_token,
        listener_task: (!listener_lost).then_some(listener_task),
        worker_task,
    })
    .await;

    if listener_lost {
        return Err(AppError::ListenerStopped);
    }
    Ok(())
}
