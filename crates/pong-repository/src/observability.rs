use std::time::Instant;

use metrics::{Label, counter, histogram};

const TABLE: &str = "pong_responses";

/// Times one repository call and reports it once the result is known.
pub(crate) struct QueryTimer {
    method: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub(crate) fn start(method: &'static str) -> Self {
        Self {
            method,
            started: Instant::now(),
        }
    }

    /// `rows` extracts the number of rows touched from a successful result.
    pub(crate) fn finish<T, E>(self, result: &Result<T, E>, rows: impl FnOnce(&T) -> usize) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let status = if result.is_ok() { "ok" } else { "error" };
        let labels = vec![
            Label::new("table", TABLE),
            Label::new("method", self.method),
            Label::new("status", status),
        ];

        counter!("pong_repository_queries_total", labels.clone()).increment(1);
        histogram!("pong_repository_query_seconds", labels.clone()).record(elapsed);
        if let Ok(value) = result {
            histogram!("pong_repository_query_rows", labels).record(rows(value) as f64);
        }
    }
}
