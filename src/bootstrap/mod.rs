use std::sync::Arc;

use pong_blockchain::{EvmChain, format_ether};
use pong_repository::RepositoryManager;

use crate::{
    config::{CliCommand, Config},
    error::AppError,
    responder::{Ledger, Responder, ResponseStore},
    runtime,
};

/// Connect the collaborators needed by `command` and run it.
pub(crate) async fn execute(command: CliCommand, config: Config) -> Result<(), AppError> {
    let chain = Arc::new(EvmChain::new(config.blockchain.clone()).await?);
    display_wallet_status(&chain).await;

    match command {
        CliCommand::Ping => send_ping(&chain).await,
        CliCommand::Run => {
            let repository = RepositoryManager::connect(&config.repository).await?;
            let store: Arc<dyn ResponseStore> = Arc::new(repository.pong_response_repository());
            let ledger: Arc<dyn Ledger> = Arc::clone(&chain) as Arc<dyn Ledger>;

            runtime::run(runtime::RuntimeDeps {
                chain,
                responder: Responder::new(ledger, store, config.responder.clone()),
                watch_poll_interval: config.responder.watch_poll_interval(),
            })
            .await
        }
    }
}

async fn send_ping(chain: &EvmChain) -> Result<(), AppError> {
    let tx_hash = chain.send_ping().await?;
    tracing::info!(tx_hash = %tx_hash, "Ping sent");
    Ok(())
}

async fn display_wallet_status(chain: &EvmChain) {
    tracing::info!("======================================================");
    tracing::info!("             Pong Responder v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("======================================================");
    tracing::info!(
        environment = crate::config::current_env(),
        contract = %chain.contract_address(),
        "Responder address: {}",
        chain.operational_address()
    );

    match chain.get_balance().await {
        Ok(balance) => tracing::info!("Responder balance: {}", format_ether(balance)),
        Err(error) => tracing::warn!(error = %error, "Failed to read responder balance"),
    }

    match chain.pinger().await {
        Ok(pinger) => tracing::info!(pinger = %pinger, "Contract pinger"),
        Err(error) => tracing::debug!(error = %error, "Failed to read contract pinger"),
    }
}
