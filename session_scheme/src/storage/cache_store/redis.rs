use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, RedisCacheStore};

const CACHE_PREFIX: &str = "cache";

impl RedisCacheStore {
    /// Opens a client for `url`. Entries written with `put` expire
    /// `default_ttl` seconds after the write.
    pub fn new(url: &str, default_ttl: Option<u64>) -> Result<Self, StorageError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            default_ttl,
        })
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// `SET`, with `EX` when an expiry applies so value and TTL land atomically.
    async fn write(
        &self,
        prefix: &str,
        key: &str,
        value: &CacheData,
        ttl: Option<u64>,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        let encoded = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;

        match ttl {
            Some(0) => {
                return Err(StorageError::InvalidInput(
                    "Cache TTL must be at least one second".to_string(),
                ));
            }
            Some(secs) => conn.set_ex::<_, _, ()>(&key, encoded, secs).await?,
            None => conn.set::<_, _, ()>(&key, encoded).await?,
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }

    async fn put(&mut self, prefix: &str, key: &str, value: CacheData) -> Result<(), StorageError> {
        self.write(prefix, key, &value, self.default_ttl).await
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        self.write(prefix, key, &value, Some(ttl as u64)).await
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let mut conn = self.connection().await?;
        let stored: Option<String> = conn.get(Self::make_key(prefix, key)).await?;

        stored
            .map(|encoded| serde_json::from_str(&encoded))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::make_key(prefix, key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key() {
        assert_eq!(
            RedisCacheStore::make_key("session", "abc"),
            "cache:session:abc"
        );
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(
            RedisCacheStore::new("not-a-redis-url", None),
            Err(StorageError::Storage(_))
        ));
    }

    #[test]
    fn test_new_keeps_default_ttl() {
        let store = RedisCacheStore::new("redis://127.0.0.1:6379", Some(120)).unwrap();
        assert_eq!(store.default_ttl, Some(120));
    }
}
