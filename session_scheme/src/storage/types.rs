use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::errors::StorageError;

/// Data stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheData {
    pub value: String,
}

impl TryFrom<&Value> for CacheData {
    type Error = StorageError;

    fn try_from(payload: &Value) -> Result<Self, Self::Error> {
        Ok(Self {
            value: serde_json::to_string(payload)?,
        })
    }
}

impl TryFrom<CacheData> for Value {
    type Error = StorageError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        Ok(serde_json::from_str(&data.value)?)
    }
}
