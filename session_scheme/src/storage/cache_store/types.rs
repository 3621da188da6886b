use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

/// Cache store shared by every in-flight request.
pub type SharedCacheStore = Arc<Mutex<Box<dyn CacheStore>>>;

pub struct InMemoryCacheStore {
    pub(super) entry: HashMap<String, CacheEntry>,
    pub(super) default_ttl: Option<u64>,
}

pub(super) struct CacheEntry {
    pub(super) data: CacheData,
    pub(super) expires_at: Option<DateTime<Utc>>,
}

pub struct RedisCacheStore {
    pub(super) client: redis::Client,
    pub(super) default_ttl: Option<u64>,
}

/// Key/value store holding session records.
///
/// The expiry policy is fixed when a store is constructed: `put` applies the
/// store's default expiry counted from the write, while `put_with_ttl` is the
/// explicit per-write override.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Expiry in seconds that `put` applies. `None` means `put` keeps
    /// entries until they are removed.
    fn default_ttl(&self) -> Option<u64>;

    /// Put a value into the store using the store's default expiry.
    async fn put(&mut self, prefix: &str, key: &str, value: CacheData) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError>;

    /// Get a value from the store. Expired entries are reported as absent.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Remove a value from the store.
    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError>;
}
