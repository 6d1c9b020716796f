mod defaults;
mod error;
mod loader;

pub(crate) use error::ConfigError;
pub(crate) use loader::{Cli, CliCommand, current_env, initialize_configuration, parse_cli};
use pong_blockchain::{BlockchainConfig, BlockchainConfigRaw};
use pong_repository::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
use serde::{Deserialize, Serialize};

use crate::{
    logger::{LoggerConfig, TelemetryConfig},
    responder::ResponderConfig,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigRaw {
    pub environment: String,
    pub blockchain: BlockchainConfigRaw,
    pub repository: RepositoryManagerConfigRaw,
    pub responder: ResponderConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub blockchain: BlockchainConfig,
    pub repository: RepositoryManagerConfig,
    pub responder: ResponderConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

impl ConfigRaw {
    pub(crate) fn resolve(self) -> Result<Config, ConfigError> {
        self.responder.validate()?;

        Ok(Config {
            blockchain: self.blockchain.resolve()?,
            repository: self.repository.resolve()?,
            responder: self.responder,
            logger: self.logger,
            telemetry: self.telemetry,
        })
    }
}
