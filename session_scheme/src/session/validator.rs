use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Result of re-validating a stored session.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub is_valid: bool,
    /// Replacement credentials. Persisted over the stored item when the
    /// session is valid; ignored otherwise.
    pub credentials: Option<Value>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            credentials: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            credentials: None,
        }
    }

    pub fn refreshed(credentials: Value) -> Self {
        Self {
            is_valid: true,
            credentials: Some(credentials),
        }
    }
}

/// The validator itself failed (lookup error, timeout, ...), as opposed to
/// reporting the session as invalid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Validator error: {0}")]
pub struct ValidatorError(pub String);

/// Re-checks a stored session payload on every authentication.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn validate(&self, item: &Value) -> Result<Validation, ValidatorError>;
}

#[async_trait]
impl<F, Fut> SessionValidator for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Validation, ValidatorError>> + Send + 'static,
{
    async fn validate(&self, item: &Value) -> Result<Validation, ValidatorError> {
        (self)(item.clone()).await
    }
}
