use pong_blockchain::BlockchainError;
use pong_repository::error::RepositoryError;
use thiserror::Error;

/// Error raised while resolving a single request.
///
/// Every variant is recoverable from the retry runner's point of view; none
/// of them terminates the process.
#[derive(Error, Debug)]
pub(crate) enum ResponderError {
    #[error("Blockchain error: {0}")]
    Blockchain(BlockchainError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid response record: {field} = {value}")]
    InvalidRecord { field: &'static str, value: String },

    #[error("No fee quote available: {0}")]
    FeeUnavailable(String),
}

/// Failure that stops the process: startup, history scan, or loss of the
/// live event feed.
#[derive(Error, Debug)]
pub(crate) enum AppError {
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request listener stopped unexpectedly")]
    ListenerStopped,
}

impl From<BlockchainError> for ResponderError {
    fn from(error: BlockchainError) -> Self {
        match error {
            BlockchainError::FeeUnavailable { reason } => Self::FeeUnavailable(reason),
            other => Self::Blockchain(other),
        }
    }
}
