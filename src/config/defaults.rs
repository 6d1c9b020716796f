//! Typed default configurations for each environment.
//!
//! Each environment (development, testnet, mainnet) gets a fully constructed
//! [`ConfigRaw`] via [`config_for`]. Secrets are never defaulted; contract
//! addresses are only defaulted for the local development chain.

use pong_blockchain::BlockchainConfigRaw;
use pong_repository::RepositoryManagerConfigRaw;

use super::{ConfigError, ConfigRaw};
use crate::{
    logger::{LogFormat, LoggerConfig, TelemetryConfig},
    responder::ResponderConfig,
};

/// Returns the default [`ConfigRaw`] for the given environment name.
pub(crate) fn config_for(environment: &str) -> Result<ConfigRaw, ConfigError> {
    match environment {
        "development" => Ok(development()),
        "testnet" => Ok(testnet()),
        "mainnet" => Ok(mainnet()),
        _ => Err(ConfigError::UnknownEnvironment(environment.to_string())),
    }
}

// ── Shared defaults ─────────────────────────────────────────────

fn responder(start_block: u64, watch_poll_interval_ms: u64) -> ResponderConfig {
    ResponderConfig {
        start_block,
        block_range: 500_000,
        retry_delay_ms: 15_000,
        max_retry_delay_ms: None,
        inclusion_timeout_ms: 60_000,
        acceleration_percent: 12,
        min_priority_fee_bump_wei: 1,
        watch_poll_interval_ms,
    }
}

fn repository(max_connections: u32) -> RepositoryManagerConfigRaw {
    RepositoryManagerConfigRaw {
        user: "root".to_string(),
        password: None,
        database: "pong_responder".to_string(),
        host: "localhost".to_string(),
        port: 3306,
        max_connections,
        min_connections: 1,
    }
}

fn blockchain(contract_address: &str, rpc_endpoints: Vec<String>) -> BlockchainConfigRaw {
    BlockchainConfigRaw {
        rpc_endpoints,
        contract_address: contract_address.to_string(),
        evm_operational_wallet_private_key: None,
        max_rpc_requests_per_second: None,
    }
}

fn telemetry(enabled: bool) -> TelemetryConfig {
    TelemetryConfig {
        enabled,
        bind_address: "0.0.0.0:9464".to_string(),
    }
}

// ── Per-environment constructors ────────────────────────────────

fn development() -> ConfigRaw {
    ConfigRaw {
        environment: "development".to_string(),
        blockchain: blockchain(
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            vec!["http://localhost:8545".to_string()],
        ),
        repository: repository(5),
        responder: responder(0, 1_000),
        logger: LoggerConfig {
            level: "pong_responder=debug,pong_blockchain=debug,pong_repository=info".to_string(),
            format: LogFormat::Pretty,
        },
        telemetry: telemetry(false),
    }
}

fn testnet() -> ConfigRaw {
    ConfigRaw {
        environment: "testnet".to_string(),
        blockchain: blockchain("", Vec::new()),
        repository: repository(10),
        responder: responder(0, 4_000),
        logger: LoggerConfig {
            level: "pong_responder=info,pong_blockchain=info,pong_repository=warn".to_string(),
            format: LogFormat::Pretty,
        },
        telemetry: telemetry(true),
    }
}

fn mainnet() -> ConfigRaw {
    ConfigRaw {
        environment: "mainnet".to_string(),
        blockchain: blockchain("", Vec::new()),
        repository: repository(10),
        responder: responder(0, 12_000),
        logger: LoggerConfig {
            level: "pong_responder=info,pong_blockchain=info,pong_repository=warn".to_string(),
            format: LogFormat::Json,
        },
        telemetry: telemetry(true),
    }
}
