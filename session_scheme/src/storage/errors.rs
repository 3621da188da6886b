use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    /// The cache backend refused or failed the operation
    #[error("Cache backend error: {0}")]
    Storage(String),

    #[error("Session record encoding error: {0}")]
    Serde(String),

    #[error("Invalid cache input: {0}")]
    InvalidInput(String),
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
