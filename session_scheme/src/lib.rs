//! session_scheme - Cache-backed session cookie authentication
//!
//! The session payload lives in a cache store under an opaque random
//! identifier; the client only ever holds that identifier, sealed into a
//! cookie. This crate is framework agnostic: an integration builds a
//! [`RequestContext`] per request, binds the [`SessionHandle`] with
//! [`SessionScheme::extend`], runs [`SessionScheme::authenticate`] and writes
//! the staged cookie back with [`SessionScheme::write_cookie_headers`].

mod config;
mod cookie;
mod errors;
mod session;
mod storage;
mod utils;

pub use config::{
    AppendNext, CookieEncoding, DEFAULT_COOKIE_NAME, DEFAULT_NEXT_PARAM, DEFAULT_TTL,
    MAX_TTL, SchemeConfig, SchemeOptions, SecretString, StoreTtl,
};
pub use cookie::{CookieCodec, CookieOptions, SealedCookieCodec, SignedCookieCodec};
pub use errors::SchemeError;
pub use session::{
    AuthMode, AuthOutcome, CookieChange, RandomIdGenerator, RequestContext, SessionHandle,
    SessionId, SessionIdGenerator, SessionScheme, SessionValidator, Unauthenticated,
    UnauthenticatedReason, UnauthenticatedResponse, Validation, ValidatorError,
};
pub use storage::{
    CacheData, CacheStore, CacheStoreConfig, CacheStoreType, InMemoryCacheStore,
    RedisCacheStore, SharedCacheStore, StorageError,
};
pub use utils::UtilError;

/// Builds the session store from `SESSION_CACHE_*` environment variables and
/// the scheme from `SESSION_*` ones.
///
/// Unless `SESSION_CACHE_DEFAULT_TTL_SECS` is set, store records expire with
/// the session TTL.
pub async fn init() -> Result<SessionScheme, SchemeError> {
    let options = SchemeOptions::from_env()?;
    let ttl_secs = SchemeConfig::try_from(options.clone())?.ttl_secs();

    let mut store_config = CacheStoreConfig::from_env()?;
    store_config.default_ttl.get_or_insert(ttl_secs);
    let store = store_config.build().await?;

    SessionScheme::new(options, store)
}
