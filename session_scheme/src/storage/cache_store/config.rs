use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore, SharedCacheStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStoreType {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheStoreType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            t => Err(StorageError::InvalidInput(format!(
                "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
            ))),
        }
    }
}

/// Settings for the backing session cache.
///
/// The default expiry is decided here, once, and every `put` on the built
/// store is renewed against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStoreConfig {
    pub store_type: CacheStoreType,
    pub url: String,
    pub default_ttl: Option<u64>,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            store_type: CacheStoreType::Memory,
            url: "memory".to_string(),
            default_ttl: None,
        }
    }
}

impl CacheStoreConfig {
    /// Reads `SESSION_CACHE_STORE_TYPE`, `SESSION_CACHE_STORE_URL` and
    /// `SESSION_CACHE_DEFAULT_TTL_SECS`.
    pub fn from_env() -> Result<Self, StorageError> {
        let store_type = match env::var("SESSION_CACHE_STORE_TYPE") {
            Ok(value) => value.parse()?,
            Err(_) => CacheStoreType::Memory,
        };

        let url = match store_type {
            CacheStoreType::Memory => env::var("SESSION_CACHE_STORE_URL")
                .unwrap_or_else(|_| "memory".to_string()),
            CacheStoreType::Redis => env::var("SESSION_CACHE_STORE_URL").map_err(|_| {
                StorageError::InvalidInput(
                    "SESSION_CACHE_STORE_URL must be set for the redis cache store".to_string(),
                )
            })?,
        };

        let default_ttl = match env::var("SESSION_CACHE_DEFAULT_TTL_SECS") {
            Ok(value) => Some(value.parse::<u64>().map_err(|_| {
                StorageError::InvalidInput(format!(
                    "SESSION_CACHE_DEFAULT_TTL_SECS must be a number of seconds, got '{value}'"
                ))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            store_type,
            url,
            default_ttl,
        })
    }

    /// Builds the store and verifies it is reachable.
    pub async fn build(&self) -> Result<SharedCacheStore, StorageError> {
        tracing::info!(
            "Initializing cache store with type: {:?}, url: {}",
            self.store_type,
            self.url
        );

        let store: Box<dyn CacheStore> = match self.store_type {
            CacheStoreType::Memory => Box::new(InMemoryCacheStore::new(self.default_ttl)),
            CacheStoreType::Redis => {
                let store = RedisCacheStore::new(&self.url, self.default_ttl).map_err(|e| {
                    tracing::error!("Failed to create Redis client: {}", e);
                    e
                })?;
                store.init().await.map_err(|e| {
                    tracing::error!("Failed to connect to Redis: {}", e);
                    e
                })?;
                Box::new(store)
            }
        };

        tracing::info!(
            "Connected to cache store: type={:?}, url={}",
            self.store_type,
            self.url
        );

        Ok(Arc::new(Mutex::new(store)))
    }
}
