mod config;
mod config_error;
pub mod error;
mod manager;
mod migrations;
mod models;
mod observability;
mod repositories;
mod types;

pub use config::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
pub use config_error::ConfigError;
pub use manager::RepositoryManager;
pub use repositories::pong_response_repository::PongResponseRepository;
pub use types::PongResponseEntry;
