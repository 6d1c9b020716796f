use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// MySQL connection settings for the response store. The password normally
/// arrives through `DB_PASSWORD` rather than the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RepositoryManagerConfigRaw {
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl RepositoryManagerConfigRaw {
    pub fn resolve(self) -> Result<RepositoryManagerConfig, ConfigError> {
        let Some(password) = self.password else {
            return Err(ConfigError::MissingSecret(
                "repository.password (or DB_PASSWORD)".to_string(),
            ));
        };
        if self.database.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "repository.database must not be empty".to_string(),
            ));
        }
        if !(1..=self.max_connections).contains(&self.min_connections.max(1)) {
            return Err(ConfigError::InvalidConfig(format!(
                "repository pool bounds {}..={} are inverted or empty",
                self.min_connections, self.max_connections
            )));
        }

        Ok(RepositoryManagerConfig {
            user: self.user,
            password,
            database: self.database,
            host: self.host,
            port: self.port,
            max_connections: self.max_connections,
            min_connections: self.min_connections,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryManagerConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl RepositoryManagerConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}
