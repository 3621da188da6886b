mod config;
mod memory;
mod redis;
mod types;

pub use config::{CacheStoreConfig, CacheStoreType};
pub use types::{CacheStore, InMemoryCacheStore, RedisCacheStore, SharedCacheStore};
