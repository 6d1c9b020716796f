use std::collections::HashMap;

use pong_blockchain::{B256, RequestEvent};

use super::{
    ports::{ResponseRecord, ResponseStore},
    range_fetcher::RangeFetcher,
};
use crate::error::ResponderError;

/// Every observed request mapped to its persisted response, if any, kept in
/// discovery order.
#[derive(Debug, Default)]
pub(crate) struct ReconciliationMap {
    entries: Vec<(B256, Option<ResponseRecord>)>,
    index: HashMap<B256, usize>,
    orphans: usize,
}

impl ReconciliationMap {
    /// Seed with the request ids, then attach records. Records whose request
    /// was not observed are orphans: counted and dropped.
    pub(crate) fn from_parts(events: &[RequestEvent], records: Vec<ResponseRecord>) -> Self {
        let mut map = Self::default();

        for event in events {
            if map.index.contains_key(&event.id) {
                continue;
            }
            map.index.insert(event.id, map.entries.len());
            map.entries.push((event.id, None));
        }

        for record in records {
            match map.index.get(&record.request_id) {
                Some(&position) => map.entries[position].1 = Some(record),
                None => {
                    tracing::warn!(
                        request_id = %record.request_id,
                        response_tx = %record.response_tx,
                        "Ignoring response record for unknown request"
                    );
                    map.orphans += 1;
                }
            }
        }

        map
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn orphans(&self) -> usize {
        self.orphans
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&B256, &Option<ResponseRecord>)> {
        self.entries.iter().map(|(id, record)| (id, record))
    }

    /// Entries still owed a confirmed response, in discovery order.
    pub(crate) fn pending(&self) -> Vec<(B256, Option<ResponseRecord>)> {
        self.iter()
            .filter(|(_, record)| !record.is_some_and(|record| record.confirmed))
            .map(|(id, record)| (*id, *record))
            .collect()
    }
}

/// Scan request history from `start_block` to `latest_block` and join it with
/// the persisted responses.
pub(crate) async fn build_reconciliation_map(
    fetcher: &RangeFetcher,
    store: &dyn ResponseStore,
    start_block: u64,
    latest_block: u64,
) -> Result<ReconciliationMap, ResponderError> {
    let events = fetcher.fetch(start_block, latest_block).await?;
    let records = store.list_responses().await?;
    let record_count = records.len();

    let map = ReconciliationMap::from_parts(&events, records);
    let pending = map.pending().len();

    tracing::info!(
        requests = map.len(),
        records = record_count,
        pending,
        orphans = map.orphans(),
        "Reconciled request history with stored responses"
    );
    pong_observability::record_reconciliation(map.len(), pending, map.orphans());

    Ok(map)
}
