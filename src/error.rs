use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Settings database connection is closed")]
    ConnectionClosed,

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(e: tokio_rusqlite::Error) -> Self {
        match e {
            tokio_rusqlite::Error::Error(e) | tokio_rusqlite::Error::Close((_, e)) => {
                Error::Database(e)
            }
            _ => Error::ConnectionClosed,
        }
    }
}

/// Unwraps errors raised inside [`crate::Database::call`] closures.
impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(e: tokio_rusqlite::Error<Error>) -> Self {
        match e {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::Close((_, e)) => Error::Database(e),
            _ => Error::ConnectionClosed,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
