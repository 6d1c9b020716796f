use std::{num::NonZeroUsize, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::client::RpcClient,
    signers::local::{LocalSignerError, PrivateKeySigner},
    transports::{
        BoxTransport, IntoBoxTransport,
        http::{Http, reqwest::Url},
        layers::FallbackLayer,
    },
};
use tower::ServiceBuilder;

use crate::{BlockchainConfig, error::BlockchainError};

pub(crate) type BlockchainProvider = Arc<DynProvider<Ethereum>>;

/// A configured RPC endpoint, classified by scheme.
#[derive(Debug, PartialEq, Eq)]
enum Endpoint {
    Http(Url),
    Ws(String),
}

impl Endpoint {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with("ws://") || raw.starts_with("wss://") {
            return Some(Self::Ws(raw.to_string()));
        }
        raw.parse::<Url>().ok().map(Self::Http)
    }

    async fn connect(self) -> Result<BoxTransport, String> {
        match self {
            Self::Http(url) => Ok(Http::new(url).into_box_transport()),
            Self::Ws(url) => RpcClient::connect_pubsub(WsConnect::new(url))
                .await
                .map(|client| client.transport().clone().into_box_transport())
                .map_err(|e| e.to_string()),
        }
    }
}

fn operational_wallet(private_key: &str) -> Result<EthereumWallet, BlockchainError> {
    let signer: PrivateKeySigner =
        private_key
            .parse()
            .map_err(|source: LocalSignerError| BlockchainError::InvalidPrivateKey {
                key_length: private_key.len(),
                source,
            })?;
    Ok(EthereumWallet::from(signer))
}

/// Builds the signing provider used for every chain interaction.
///
/// Endpoints are tried in order; the fallback layer keeps a single active
/// transport and moves to the next one when it stops answering.
pub(crate) async fn initialize_provider(
    config: &BlockchainConfig,
) -> Result<BlockchainProvider, BlockchainError> {
    let wallet = operational_wallet(config.evm_operational_wallet_private_key())?;

    let mut transports = Vec::with_capacity(config.rpc_endpoints().len());
    for raw in config.rpc_endpoints() {
        let Some(endpoint) = Endpoint::parse(raw) else {
            tracing::warn!(endpoint = %raw, "Skipping malformed RPC endpoint");
            continue;
        };
        match endpoint.connect().await {
            Ok(transport) => {
                tracing::debug!(endpoint = %raw, "RPC endpoint registered");
                transports.push(transport);
            }
            Err(error) => tracing::warn!(endpoint = %raw, %error, "RPC endpoint unreachable"),
        }
    }

    if transports.is_empty() {
        return Err(BlockchainError::RpcConnectionFailed {
            attempts: config.rpc_endpoints().len(),
        });
    }
    let usable = transports.len();

    let transport = ServiceBuilder::new()
        .layer(FallbackLayer::default().with_active_transport_count(NonZeroUsize::MIN))
        .service(transports);
    let provider = ProviderBuilder::new()
        .wallet(wallet)
        .connect_client(RpcClient::builder().transport(transport, false));

    let head = provider.get_block_number().await.map_err(|error| {
        tracing::error!(%error, "No RPC endpoint answered the connectivity check");
        BlockchainError::RpcConnectionFailed { attempts: usable }
    })?;
    tracing::info!(endpoints = usable, head, "Chain provider ready");

    Ok(Arc::new(provider.erased()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn endpoints_are_classified_by_scheme() {
        assert!(matches!(
            Endpoint::parse("http://localhost:8545"),
            Some(Endpoint::Http(_))
        ));
        assert_eq!(
            Endpoint::parse(" wss://rpc.example.org/ws "),
            Some(Endpoint::Ws("wss://rpc.example.org/ws".to_string()))
        );
        assert_eq!(Endpoint::parse("not a url"), None);
    }

    #[test]
    fn malformed_private_key_reports_its_length() {
        let err = operational_wallet("0x1234").unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidPrivateKey { key_length: 6, .. }
        ));
    }
}
