use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Records one resolved request. `outcome` is one of `sent`, `accelerated`,
/// `confirmed`, `resent`, `already_confirmed`.
pub fn record_response_outcome(outcome: &str, duration: Duration) {
    counter!(
        "pong_responder_outcome_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "pong_responder_resolve_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_response_retry() {
    counter!("pong_responder_retries_total").increment(1);
}

pub fn record_response_submission(kind: &str) {
    counter!(
        "pong_responder_submissions_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_dispatch_queue_depth(depth: usize) {
    gauge!("pong_responder_queue_depth").set(depth as f64);
}

pub fn record_reconciliation(requests: usize, pending: usize, orphans: usize) {
    gauge!("pong_responder_reconciled_requests").set(requests as f64);
    gauge!("pong_responder_reconciled_pending").set(pending as f64);
    gauge!("pong_responder_reconciled_orphans").set(orphans as f64);
}

pub fn record_malformed_records(count: usize) {
    counter!("pong_responder_malformed_records_total").increment(count as u64);
}
