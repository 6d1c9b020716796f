use std::time::Duration;

use metrics::{Label, counter, histogram};

fn status(ok: bool) -> &'static str {
    if ok { "ok" } else { "error" }
}

/// One JSON-RPC round trip, successful or not.
pub fn record_blockchain_rpc_call(operation: &'static str, ok: bool, duration: Duration) {
    let labels = vec![
        Label::new("operation", operation),
        Label::new("status", status(ok)),
    ];
    counter!("pong_rpc_calls_total", labels.clone()).increment(1);
    histogram!("pong_rpc_call_seconds", labels).record(duration.as_secs_f64());
}

pub fn record_blockchain_rpc_retry(operation: &'static str) {
    counter!("pong_rpc_retries_total", "operation" => operation).increment(1);
}

/// One `eth_getLogs` window. `logs` is `None` when the query failed.
pub fn record_blockchain_log_window(
    event: &'static str,
    block_span: u64,
    logs: Option<usize>,
    duration: Duration,
) {
    let labels = vec![
        Label::new("event", event),
        Label::new("status", status(logs.is_some())),
    ];
    counter!("pong_log_windows_total", labels.clone()).increment(1);
    histogram!("pong_log_window_seconds", labels.clone()).record(duration.as_secs_f64());
    histogram!("pong_log_window_blocks", labels.clone()).record(block_span as f64);
    if let Some(logs) = logs {
        histogram!("pong_log_window_events", labels).record(logs as f64);
    }
}
