use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] Box<figment::Error>),

    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Missing required config file: {0}")]
    MissingConfig(String),

    #[error("Missing required environment setting: {0}")]
    MissingEnvironment(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<pong_blockchain::ConfigError> for ConfigError {
    fn from(error: pong_blockchain::ConfigError) -> Self {
        match error {
            pong_blockchain::ConfigError::MissingSecret(secret) => Self::MissingSecret(secret),
            pong_blockchain::ConfigError::InvalidConfig(reason) => {
                Self::InvalidConfig(format!("blockchain: {reason}"))
            }
        }
    }
}

impl From<pong_repository::ConfigError> for ConfigError {
    fn from(error: pong_repository::ConfigError) -> Self {
        match error {
            pong_repository::ConfigError::MissingSecret(secret) => Self::MissingSecret(secret),
            pong_repository::ConfigError::InvalidConfig(reason) => {
                Self::InvalidConfig(format!("repository: {reason}"))
            }
        }
    }
}
