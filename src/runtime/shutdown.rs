use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const LISTENER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(90);

pub(super) struct ShutdownContext {
    pub(super) shutdown: CancellationToken,
    /// `None` when the listener has already exited.
    pub(super) listener_task: Option<JoinHandle<()>>,
    pub(super) worker_task: JoinHandle<()>,
}

pub(super) async fn graceful_shutdown(context: ShutdownContext) {
    // 1. Cancel: the listener stops enqueueing, the worker stops taking tasks
    //    and the retry runner stops between attempts.
    // 2. Wait for the listener.
    // 3. Wait for the worker to finish the attempt in flight. The wait covers
    //    one inclusion timeout; past that the task is aborted and its stored
    //    record is picked up by the next startup scan.
    let ShutdownContext {
        shutdown,
        listener_task,
        mut worker_task,
    } = context;

    tracing::info!("Shutting down gracefully...");

    shutdown.cancel();

    if let Some(mut listener_task) = listener_task {
        wait_for_shutdown_task(
            "request_listener",
            LISTENER_SHUTDOWN_TIMEOUT,
            &mut listener_task,
            true,
        )
        .await;
    }

    wait_for_shutdown_task(
        "dispatch_worker",
        WORKER_SHUTDOWN_TIMEOUT,
        &mut worker_task,
        true,
    )
    .await;

    tracing::info!("Shutdown complete");
}

async fn wait_for_shutdown_task(
    task: &str,
    timeout: Duration,
    handle: &mut JoinHandle<()>,
    abort_on_timeout: bool,
) {
    match tokio::time::timeout(timeout, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!(
            task,
            error = ?error,
            "Shutdown task panicked"
        ),
        Err(_) if abort_on_timeout => {
            tracing::warn!(
                task,
                timeout_secs = timeout.as_secs(),
                "Shutdown timeout reached, aborting task"
            );
            handle.abort();
            let _ = handle.await;
        }
        Err(_) => tracing::warn!(
            task,
            timeout_secs = timeout.as_secs(),
            "Shutdown timeout reached"
        ),
    }
}
