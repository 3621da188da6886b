use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SchemeError {
    /// Invalid scheme options, raised once at construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid session: {0}")]
    InvalidPayload(String),

    #[error("The session scheme may not be bound more than once per request")]
    AlreadyBound,

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<StorageError> for SchemeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SchemeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(StorageError::from(err).to_string())
    }
}
