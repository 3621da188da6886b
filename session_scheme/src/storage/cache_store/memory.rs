use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::HashMap;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheEntry, CacheStore, InMemoryCacheStore};

const CACHE_PREFIX: &str = "cache";

impl InMemoryCacheStore {
    /// Creates a store whose entries expire `default_ttl` seconds after their
    /// last write. `None` keeps entries until they are removed.
    pub fn new(default_ttl: Option<u64>) -> Self {
        tracing::info!(
            "Creating new in-memory session cache store (default ttl: {:?}s)",
            default_ttl
        );
        Self {
            entry: HashMap::new(),
            default_ttl,
        }
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }

    fn insert(&mut self, key: String, data: CacheData, ttl: Option<u64>) -> Result<(), StorageError> {
        let now = Utc::now();
        let expires_at = match ttl {
            Some(secs) => {
                let expires_at = i64::try_from(secs)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        StorageError::InvalidInput(
                            "TTL value too large for storage backend".to_string(),
                        )
                    })?;
                Some(expires_at)
            }
            None => None,
        };

        // Writes are the only place expired entries get swept
        self.entry
            .retain(|_, entry| entry.expires_at.is_none_or(|at| at > now));
        self.entry.insert(key, CacheEntry { data, expires_at });
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }

    async fn put(&mut self, prefix: &str, key: &str, value: CacheData) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.insert(key, value, self.default_ttl)
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.insert(key, value, Some(ttl as u64))
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = Self::make_key(prefix, key);
        let now = Utc::now();
        Ok(self
            .entry
            .get(&key)
            .filter(|entry| entry.expires_at.is_none_or(|at| at > now))
            .map(|entry| entry.data.clone()))
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.entry.remove(&key);
        Ok(())
    }
}
