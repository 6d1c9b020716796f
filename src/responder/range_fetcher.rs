use std::sync::Arc;

use futures::future::try_join_all;
use pong_blockchain::{BlockchainError, RequestEvent};

use super::ports::Ledger;

/// Fetches request events over an arbitrarily long block span by splitting it
/// into bounded windows that are queried concurrently.
pub(crate) struct RangeFetcher {
    ledger: Arc<dyn Ledger>,
    block_range: u64,
}

impl RangeFetcher {
    pub(crate) fn new(ledger: Arc<dyn Ledger>, block_range: u64) -> Self {
        Self {
            ledger,
            block_range: block_range.max(1),
        }
    }

    /// Every request event in `from_block..=to_block`, in chain order.
    ///
    /// One failed window fails the whole fetch.
    pub(crate) async fn fetch(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RequestEvent>, BlockchainError> {
        let windows = block_windows(from_block, to_block, self.block_range);
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            from_block,
            to_block,
            windows = windows.len(),
            "Fetching request events"
        );

        let batches = try_join_all(windows.iter().map(|&(from, to)| {
            let ledger = Arc::clone(&self.ledger);
            async move {
                let events = ledger.request_events(from, to).await?;
                tracing::debug!(from_block = from, to_block = to, events = events.len(), "Fetched window");
                Ok::<_, BlockchainError>(events)
            }
        }))
        .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Consecutive inclusive windows of at most `size` blocks covering
/// `from..=to`; the last window is clipped to `to`.
pub(crate) fn block_windows(from: u64, to: u64, size: u64) -> Vec<(u64, u64)> {
    let size = size.max(1);
    let mut windows = Vec::new();
    let mut start = from;

    while start <= to {
        let end = start.saturating_add(size - 1).min(to);
        windows.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }

    windows
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::responder::ports::testing::{FakeLedger, request};

    #[test]
    fn windows_cover_span_and_clip_last() {
        assert_eq!(
            block_windows(10, 34, 10),
            vec![(10, 19), (20, 29), (30, 34)]
        );
        assert_eq!(block_windows(5, 5, 100), vec![(5, 5)]);
        assert!(block_windows(6, 5, 100).is_empty());
        assert_eq!(block_windows(0, 2, 0), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn windows_stop_at_end_of_block_space() {
        assert_eq!(
            block_windows(u64::MAX - 1, u64::MAX, 10),
            vec![(u64::MAX - 1, u64::MAX)]
        );
    }

    #[tokio::test]
    async fn split_fetch_matches_single_fetch() {
        let events = vec![
            request(0x01, 3),
            request(0x02, 3),
            request(0x03, 17),
            request(0x04, 40),
            request(0x05, 41),
            request(0x06, 99),
        ];
        let ledger = Arc::new(FakeLedger::new().with_events(100, events.clone()));

        let whole = RangeFetcher::new(ledger.clone(), 1_000).fetch(0, 100).await.unwrap();
        assert_eq!(whole, events);

        for size in [1, 2, 7, 10, 33, 64] {
            let split = RangeFetcher::new(ledger.clone(), size).fetch(0, 100).await.unwrap();
            assert_eq!(split, whole, "window size {size}");
        }
    }

    #[tokio::test]
    async fn fetch_queries_each_window_once() {
        let ledger = Arc::new(FakeLedger::new().with_events(25, vec![request(0x01, 12)]));

        let events = RangeFetcher::new(ledger.clone(), 10).fetch(0, 25).await.unwrap();

        assert_eq!(events, vec![request(0x01, 12)]);
        let mut queries = ledger.log_queries();
        queries.sort();
        assert_eq!(queries, vec![(0, 9), (10, 19), (20, 25)]);
    }

    #[tokio::test]
    async fn one_failed_window_fails_the_fetch() {
        let ledger = Arc::new(
            FakeLedger::new()
                .with_events(30, vec![request(0x01, 2), request(0x02, 25)])
                .with_undecodable_log_at(14),
        );

        let result = RangeFetcher::new(ledger, 10).fetch(0, 30).await;

        assert!(matches!(result, Err(BlockchainError::Decode { .. })));
    }

    #[tokio::test]
    async fn empty_span_issues_no_queries() {
        let ledger = Arc::new(FakeLedger::new());

        let events = RangeFetcher::new(ledger.clone(), 10).fetch(50, 10).await.unwrap();

        assert!(events.is_empty());
        assert!(ledger.log_queries().is_empty());
    }
}
