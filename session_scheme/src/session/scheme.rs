use http::HeaderMap;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{SchemeConfig, SchemeOptions, StoreTtl};
use crate::cookie::{
    CookieCodec, CookieOptions, codec_for, get_cookie_value, header_clear_cookie,
    header_set_cookie,
};
use crate::errors::SchemeError;
use crate::storage::{CacheData, SESSION_CACHE_PREFIX, SharedCacheStore};
use crate::utils::UtilError;

use super::binding::{CookieChange, IncomingCookie, RequestContext, SessionHandle};
use super::id::{RandomIdGenerator, SessionIdGenerator};
use super::types::{AuthOutcome, SessionId, UnauthenticatedReason};
use super::unauthenticated::unauthenticated;
use super::validator::Validation;

/// Cookie-based session authentication backed by a cache store.
///
/// Cheap to clone; every clone shares the configuration, store, codec and
/// identifier generator.
#[derive(Clone)]
pub struct SessionScheme {
    config: Arc<SchemeConfig>,
    store: SharedCacheStore,
    codec: Arc<dyn CookieCodec>,
    ids: Arc<dyn SessionIdGenerator>,
}

impl std::fmt::Debug for SessionScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheme")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionScheme {
    /// Validates `options` and builds a scheme over `store`.
    pub fn new(options: SchemeOptions, store: SharedCacheStore) -> Result<Self, SchemeError> {
        let config = SchemeConfig::try_from(options)?;
        let codec = codec_for(&config)?;

        tracing::debug!("Session scheme configured: {:?}", config);

        Ok(Self {
            config: Arc::new(config),
            store,
            codec,
            ids: Arc::new(RandomIdGenerator),
        })
    }

    pub fn with_id_generator(mut self, ids: impl SessionIdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_codec(mut self, codec: impl CookieCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    /// Reads the session cookie from `headers` and starts the per-request state.
    pub fn request_context(&self, headers: &HeaderMap, path_and_query: &str) -> RequestContext {
        let current = match get_cookie_value(headers, self.config.cookie_name()) {
            None => IncomingCookie::Absent,
            Some(value) => self
                .codec
                .unseal(&value)
                .and_then(|session_id| SessionId::parse(&session_id))
                .map_or(IncomingCookie::Malformed, IncomingCookie::Present),
        };
        RequestContext::new(path_and_query, current)
    }

    /// Installs the session capability on `ctx` and returns it. A context
    /// accepts one session capability only.
    pub fn extend(&self, ctx: &RequestContext) -> Result<SessionHandle, SchemeError> {
        let handle = SessionHandle {
            scheme: self.clone(),
            cookies: Arc::clone(&ctx.cookies),
        };
        ctx.session
            .set(handle.clone())
            .map_err(|_| SchemeError::AlreadyBound)?;
        Ok(handle)
    }

    /// Authenticates the request behind `ctx`.
    ///
    /// Unauthenticated requests are reported as [`AuthOutcome::Unauthenticated`];
    /// `Err` is reserved for store failures.
    #[tracing::instrument(skip(self, ctx), fields(path = %ctx.path_and_query()))]
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<AuthOutcome, SchemeError> {
        tokio::task::yield_now().await;

        let session_id = match ctx.current_cookie().await {
            IncomingCookie::Absent => {
                return Ok(self.reject(ctx, UnauthenticatedReason::MissingCookie));
            }
            IncomingCookie::Malformed => {
                tracing::debug!("Session cookie could not be unsealed");
                return Ok(self.reject(ctx, UnauthenticatedReason::InvalidCookie));
            }
            IncomingCookie::Present(session_id) => session_id,
        };

        let Some(item) = self.load_session(&session_id).await? else {
            return Ok(self.reject(ctx, UnauthenticatedReason::SessionNotFound));
        };

        let Some(validator) = self.config.validator() else {
            tracing::debug!("Session authenticated");
            return Ok(AuthOutcome::Authenticated(item));
        };

        let reason = match validator.validate(&item).await {
            Ok(Validation {
                is_valid: true,
                credentials,
            }) => {
                return match credentials.filter(has_content) {
                    Some(credentials) => {
                        self.write_session(&session_id, &credentials).await?;
                        tracing::debug!("Session authenticated with refreshed credentials");
                        Ok(AuthOutcome::Authenticated(credentials))
                    }
                    None => {
                        tracing::debug!("Session authenticated");
                        Ok(AuthOutcome::Authenticated(item))
                    }
                };
            }
            Ok(_) => UnauthenticatedReason::FailedValidation,
            Err(e) => {
                tracing::warn!("Session validator failed: {}", e);
                UnauthenticatedReason::ValidatorError(e.0)
            }
        };

        let mut diagnostic = None;
        if self.config.clear_invalid() {
            ctx.cookies.lock().await.forget();
            if let Err(e) = self.remove_session(&session_id).await {
                tracing::warn!("Failed to drop invalid session: {}", e);
                diagnostic = Some(e.to_string());
            }
        }

        let mut outcome = unauthenticated(&self.config, reason, ctx.path_and_query());
        outcome.item = Some(item);
        outcome.diagnostic = diagnostic;
        Ok(AuthOutcome::Unauthenticated(outcome))
    }

    /// Renders the staged cookie change of `ctx` as a `Set-Cookie` header.
    pub async fn write_cookie_headers(
        &self,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
    ) -> Result<(), SchemeError> {
        let Some(change) = ctx.take_cookie_change().await else {
            return Ok(());
        };

        let options = CookieOptions::from(self.config.as_ref());
        let result = match change {
            CookieChange::Set(value) => header_set_cookie(headers, &options, &value),
            CookieChange::Clear => header_clear_cookie(headers, &options),
        };
        result
            .map(|_| ())
            .map_err(|e| match e {
                UtilError::Cookie(msg) => SchemeError::Cookie(msg),
                other => SchemeError::from(other),
            })
            .inspect_err(|e| tracing::error!("Failed to write session cookie: {}", e))
    }

    fn reject(&self, ctx: &RequestContext, reason: UnauthenticatedReason) -> AuthOutcome {
        AuthOutcome::Unauthenticated(unauthenticated(&self.config, reason, ctx.path_and_query()))
    }

    pub(crate) fn generate_id(&self) -> Result<SessionId, SchemeError> {
        self.ids.generate()
    }

    pub(crate) fn seal(&self, session_id: &SessionId) -> Result<String, SchemeError> {
        self.codec.seal(session_id.as_str())
    }

    async fn load_session(&self, session_id: &SessionId) -> Result<Option<Value>, SchemeError> {
        let data = self
            .store
            .lock()
            .await
            .get(SESSION_CACHE_PREFIX, session_id.as_str())
            .await
            .inspect_err(|e| tracing::error!("Failed to load session: {}", e))?;

        let Some(data) = data else {
            tracing::debug!("Session not found in store");
            return Ok(None);
        };

        match Value::try_from(data) {
            Ok(item) if item.is_object() => Ok(Some(item)),
            Ok(_) => {
                tracing::warn!("Stored session is not a JSON object, ignoring it");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Stored session could not be decoded: {}", e);
                Ok(None)
            }
        }
    }

    pub(crate) async fn write_session(
        &self,
        session_id: &SessionId,
        payload: &Value,
    ) -> Result<(), SchemeError> {
        if !payload.is_object() {
            return Err(SchemeError::InvalidPayload(
                "Session payload must be a JSON object".to_string(),
            ));
        }
        let data = CacheData::try_from(payload)?;

        let mut store = self.store.lock().await;
        // A store without its own expiry would keep records forever
        let use_store_default = match self.config.store_ttl() {
            StoreTtl::StoreDefault if store.default_ttl().is_some() => true,
            StoreTtl::StoreDefault => {
                tracing::debug!("Session store has no default expiry, using the session TTL");
                false
            }
            StoreTtl::PerWrite => false,
        };
        let result = if use_store_default {
            store
                .put(SESSION_CACHE_PREFIX, session_id.as_str(), data)
                .await
        } else {
            let ttl = usize::try_from(self.config.ttl_secs()).unwrap_or(usize::MAX);
            store
                .put_with_ttl(SESSION_CACHE_PREFIX, session_id.as_str(), data, ttl)
                .await
        };
        result.inspect_err(|e| tracing::error!("Failed to store session: {}", e))?;
        Ok(())
    }

    pub(crate) async fn remove_session(&self, session_id: &SessionId) -> Result<(), SchemeError> {
        self.store
            .lock()
            .await
            .remove(SESSION_CACHE_PREFIX, session_id.as_str())
            .await
            .inspect_err(|e| tracing::error!("Failed to remove session: {}", e))?;
        Ok(())
    }
}

/// Refreshed credentials replace the stored item only when they carry data.
fn has_content(credentials: &Value) -> bool {
    match credentials {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
