mod cache_store;
mod errors;
mod types;

pub use cache_store::{
    CacheStore, CacheStoreConfig, CacheStoreType, InMemoryCacheStore, RedisCacheStore,
    SharedCacheStore,
};
pub use errors::StorageError;
pub use types::CacheData;

/// Cache prefix under which session records live
pub(crate) const SESSION_CACHE_PREFIX: &str = "session";
