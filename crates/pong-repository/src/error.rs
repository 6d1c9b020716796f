use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    /// A row written by `upsert_response` could not be read back.
    #[error("Response record for request {0} vanished after upsert")]
    MissingAfterUpsert(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
