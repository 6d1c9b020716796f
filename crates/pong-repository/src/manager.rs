use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

pub use crate::config::RepositoryManagerConfig;
use crate::{
    error::RepositoryError, migrations::Migrator,
    repositories::pong_response_repository::PongResponseRepository,
};

pub struct RepositoryManager {
    pong_response_repository: PongResponseRepository,
}

impl RepositoryManager {
    /// Opens the MySQL pool and brings the schema up to date.
    pub async fn connect(config: &RepositoryManagerConfig) -> Result<Self, RepositoryError> {
        let mut options = ConnectOptions::new(config.connection_string());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        let conn = Arc::new(Database::connect(options).await?);
        Migrator::up(conn.as_ref(), None).await?;
        tracing::info!(
            host = %config.host,
            database = %config.database,
            pool = config.max_connections,
            "Response store ready"
        );

        Ok(Self {
            pong_response_repository: PongResponseRepository::new(conn),
        })
    }

    pub fn pong_response_repository(&self) -> PongResponseRepository {
        self.pong_response_repository.clone()
    }
}
