use std::{sync::Arc, time::{Duration, Instant}};

use async_trait::async_trait;
use pong_blockchain::B256;
use tokio_util::sync::CancellationToken;

use super::{
    engine::{Resolution, ResubmissionEngine},
    ports::{ResponseRecord, ResponseStore},
    queue::DispatchTask,
};
use crate::error::ResponderError;

/// Delay between attempts at resolving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPolicy {
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed(delay) => delay,
            RetryPolicy::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(31);
                base.saturating_mul(1_u32 << exponent).min(max)
            }
        }
    }
}

#[async_trait]
pub(crate) trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

pub(crate) struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Result of running one request to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryOutcome {
    Resolved(Resolution),
    /// Shutdown was requested between attempts; the stored record is picked
    /// up again by the next startup scan.
    Abandoned,
}

/// Drives [`ResubmissionEngine::resolve`] until it succeeds.
///
/// The task's record is used for the first attempt only, unless the task asks
/// for a fresh read. Later attempts always re-read the record, since a failed
/// attempt may already have stored a submitted transaction.
pub(crate) struct RetryRunner {
    engine: ResubmissionEngine,
    store: Arc<dyn ResponseStore>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryRunner {
    pub(crate) fn new(
        engine: ResubmissionEngine,
        store: Arc<dyn ResponseStore>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            engine,
            store,
            policy,
            sleeper,
        }
    }

    pub(crate) async fn run(&self, task: DispatchTask, shutdown: &CancellationToken) -> RetryOutcome {
        let request_id = task.request_id;
        let started = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            let refresh = task.refresh || attempt > 1;
            match self.attempt(request_id, task.record, refresh).await {
                Ok(resolution) => {
                    pong_observability::record_response_outcome(
                        resolution.as_str(),
                        started.elapsed(),
                    );
                    tracing::debug!(
                        request_id = %request_id,
                        attempts = attempt,
                        outcome = resolution.as_str(),
                        "Request resolved"
                    );
                    return RetryOutcome::Resolved(resolution);
                }
                Err(error) => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        request_id = %request_id,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "Failed to resolve request; retrying"
                    );
                    pong_observability::record_response_retry();

                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {
                            tracing::info!(
                                request_id = %request_id,
                                attempt,
                                "Shutdown requested; abandoning retries"
                            );
                            return RetryOutcome::Abandoned;
                        }
                        _ = self.sleeper.sleep(delay) => {}
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn attempt(
        &self,
        request_id: B256,
        known: Option<ResponseRecord>,
        refresh: bool,
    ) -> Result<Resolution, ResponderError> {
        let record = if refresh {
            self.store.get_response(request_id).await?
        } else {
            known
        };

        self.engine.resolve(request_id, record).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use pong_blockchain::{BlockchainError, TransactionLookup};

    use super::*;
    use crate::responder::{
        engine::ResubmissionSettings,
        ports::testing::{FakeLedger, MemoryStore, hash},
    };

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn runner(
        ledger: &Arc<FakeLedger>,
        store: &Arc<MemoryStore>,
        sleeper: &Arc<RecordingSleeper>,
    ) -> RetryRunner {
        let engine = ResubmissionEngine::new(
            ledger.clone(),
            store.clone(),
            ResubmissionSettings {
                inclusion_timeout: Duration::from_secs(60),
                acceleration_percent: 12,
                min_priority_fee_bump: 1,
            },
        );
        RetryRunner::new(
            engine,
            store.clone(),
            RetryPolicy::Fixed(Duration::from_secs(15)),
            sleeper.clone(),
        )
    }

    fn transient() -> BlockchainError {
        BlockchainError::Custom("connection reset".to_string())
    }

    #[test]
    fn exponential_policy_doubles_up_to_cap() {
        let policy = RetryPolicy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(10),
        };
        let delays: Vec<_> = (1..=6).map(|attempt| policy.delay_for(attempt)).collect();
        assert_eq!(
            delays,
            [1, 2, 4, 8, 10, 10].map(Duration::from_secs).to_vec()
        );
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
        assert_eq!(
            RetryPolicy::Fixed(Duration::from_millis(5)).delay_for(9),
            Duration::from_millis(5)
        );
    }

    #[tokio::test]
    async fn retries_with_fixed_delay_until_success() {
        let ledger = Arc::new(FakeLedger::new());
        ledger.fail_next_submission(transient());
        ledger.fail_next_submission(transient());
        let store = Arc::new(MemoryStore::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(hash(0xaa), None), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::Sent));
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(15); 2]
        );
        assert_eq!(store.records().len(), 1);
        assert!(store.records()[0].confirmed);
    }

    #[tokio::test]
    async fn retry_attempts_reread_the_stored_record() {
        let request = hash(0xaa);
        let stale = hash(0xcc);
        let stored = ResponseRecord {
            request_id: request,
            response_tx: stale,
            confirmed: true,
        };
        let ledger = Arc::new(FakeLedger::new());
        ledger.fail_next_submission(transient());
        let store = Arc::new(MemoryStore::with_records(vec![stored]));
        let sleeper = Arc::new(RecordingSleeper::default());

        // The snapshot says unanswered, but the store already holds a
        // confirmed answer by the time the retry runs.
        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(request, None), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::AlreadyConfirmed));
        assert_eq!(store.reads(), 1);
        assert!(ledger.submissions().is_empty());
        assert_eq!(store.records(), vec![stored]);
    }

    #[tokio::test]
    async fn first_attempt_uses_the_given_record() {
        let request = hash(0xaa);
        let response = hash(0xab);
        let record = ResponseRecord {
            request_id: request,
            response_tx: response,
            confirmed: false,
        };
        let ledger = Arc::new(
            FakeLedger::new().with_lookup(response, TransactionLookup::Included { block_number: 3 }),
        );
        let store = Arc::new(MemoryStore::with_records(vec![record]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(request, Some(record)), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::Confirmed));
        assert_eq!(store.reads(), 0);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_task_reads_the_record_first() {
        let request = hash(0xaa);
        let stored = ResponseRecord {
            request_id: request,
            response_tx: hash(0xab),
            confirmed: true,
        };
        let ledger = Arc::new(FakeLedger::new());
        let store = Arc::new(MemoryStore::with_records(vec![stored]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::refresh(request), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::AlreadyConfirmed));
        assert_eq!(store.reads(), 1);
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn reverted_response_is_resent_on_retry() {
        let request = hash(0xaa);
        let ledger = Arc::new(FakeLedger::new());
        ledger.fail_next_wait(TransactionLookup::Reverted { block_number: 9 });
        let store = Arc::new(MemoryStore::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(request, None), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::Resent));
        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(
            store.records(),
            vec![ResponseRecord {
                request_id: request,
                response_tx: submissions[1].tx_hash,
                confirmed: true,
            }]
        );
    }

    #[tokio::test]
    async fn timed_out_wait_is_confirmed_on_retry_without_resending() {
        let request = hash(0xaa);
        let ledger = Arc::new(FakeLedger::new());
        ledger.fail_next_wait(TransactionLookup::Included { block_number: 4 });
        let store = Arc::new(MemoryStore::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(request, None), &CancellationToken::new())
            .await;

        assert_eq!(outcome, RetryOutcome::Resolved(Resolution::Confirmed));
        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(
            store.records(),
            vec![ResponseRecord {
                request_id: request,
                response_tx: submissions[0].tx_hash,
                confirmed: true,
            }]
        );
    }

    #[tokio::test]
    async fn shutdown_abandons_pending_retries() {
        let ledger = Arc::new(FakeLedger::new());
        ledger.fail_next_submission(transient());
        let store = Arc::new(MemoryStore::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let outcome = runner(&ledger, &store, &sleeper)
            .run(DispatchTask::known(hash(0xaa), None), &shutdown)
            .await;

        assert_eq!(outcome, RetryOutcome::Abandoned);
        assert!(store.records().is_empty());
    }
}
