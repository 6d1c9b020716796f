use std::time::{Duration, Instant};

use alloy::{providers::Provider, rpc::types::Filter};
use futures::{StreamExt, stream::BoxStream};

use crate::{
    EventKind, RequestEvent,
    chains::evm::EvmChain,
    error::BlockchainError,
};

/// Newly mined request events, one batch per poll.
pub type RequestEventStream = BoxStream<'static, Vec<RequestEvent>>;

impl EvmChain {
    pub async fn get_block_number(&self) -> Result<u64, BlockchainError> {
        self.rpc_call("get_block_number", || async {
            self.provider().get_block_number().await
        })
        .await
        .map_err(BlockchainError::rpc("get_block_number"))
    }

    /// Request events in `from_block..=to_block` with a single `eth_getLogs`.
    ///
    /// Decoding is strict: one malformed log fails the whole query.
    pub async fn get_request_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RequestEvent>, BlockchainError> {
        let kind = EventKind::Ping;
        let filter = Filter::new()
            .address(self.contract_address())
            .event_signature(kind.signature_hash())
            .from_block(from_block)
            .to_block(to_block);
        let block_span = to_block.saturating_sub(from_block) + 1;

        let started = Instant::now();
        let logs = match self
            .rpc_call("get_logs", || async { self.provider().get_logs(&filter).await })
            .await
        {
            Ok(logs) => logs,
            Err(source) => {
                pong_observability::record_blockchain_log_window(
                    kind.as_str(),
                    block_span,
                    None,
                    started.elapsed(),
                );
                return Err(BlockchainError::GetLogs {
                    from_block,
                    to_block,
                    source,
                });
            }
        };

        pong_observability::record_blockchain_log_window(
            kind.as_str(),
            block_span,
            Some(logs.len()),
            started.elapsed(),
        );

        logs.iter().map(RequestEvent::from_log).collect()
    }

    /// Watch for new request events through a polled log filter.
    ///
    /// Logs that fail to decode are logged and dropped; the filter already
    /// restricts the stream to the `Ping` signature.
    pub async fn watch_request_events(
        &self,
        poll_interval: Duration,
    ) -> Result<RequestEventStream, BlockchainError> {
        let filter = Filter::new()
            .address(self.contract_address())
            .event_signature(EventKind::Ping.signature_hash());

        let poller = self
            .rpc_call("watch_logs", || async {
                self.provider().watch_logs(&filter).await
            })
            .await
            .map_err(BlockchainError::rpc("watch_logs"))?;

        let stream = poller
            .with_poll_interval(poll_interval)
            .into_stream()
            .map(|logs| {
                logs.iter()
                    .filter_map(|log| match RequestEvent::from_log(log) {
                        Ok(event) => Some(event),
                        Err(error) => {
                            tracing::warn!(error = %error, "Dropping undecodable request log");
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            });

        Ok(stream.boxed())
    }
}
