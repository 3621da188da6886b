//! session_scheme_axum - axum middleware and extractors for session_scheme
//!
//! Pick one middleware per route group with
//! `axum::middleware::from_fn_with_state(scheme, ...)`:
//! [`require_session`], [`try_session`] or [`bind_session`]. Handlers then
//! extract [`AuthCredentials`] and [`Session`].

mod error;
mod middleware;
mod session;

pub use error::IntoResponseError;
pub use middleware::{bind_session, require_session, try_session};
pub use session::{AuthCredentials, Session, SessionRejection};

// Re-export the core types so applications depend on this crate only
pub use session_scheme::{
    AppendNext, AuthMode, CacheStore, CacheStoreConfig, CacheStoreType, CookieEncoding,
    DEFAULT_TTL, InMemoryCacheStore, MAX_TTL, SchemeError, SchemeOptions, SessionHandle, SessionId,
    SessionScheme, SessionValidator, SharedCacheStore, StoreTtl, Validation, ValidatorError, init,
};
