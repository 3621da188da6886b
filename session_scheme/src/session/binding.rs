//! Per-request session state and the `set`/`clear` capability handed to
//! request handlers.

use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::errors::SchemeError;

use super::scheme::SessionScheme;
use super::types::SessionId;

/// Session cookie as presented by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IncomingCookie {
    Absent,
    /// Present, but tampered with, sealed under another password or not
    /// shaped like an identifier.
    Malformed,
    Present(SessionId),
}

/// Cookie change to send back with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    /// Sealed cookie value carrying the session identifier.
    Set(String),
    Clear,
}

#[derive(Debug)]
pub(crate) struct CookieState {
    pub(crate) current: IncomingCookie,
    pub(crate) pending: Option<CookieChange>,
}

impl CookieState {
    pub(crate) fn forget(&mut self) -> Option<SessionId> {
        self.pending = Some(CookieChange::Clear);
        match std::mem::replace(&mut self.current, IncomingCookie::Absent) {
            IncomingCookie::Present(session_id) => Some(session_id),
            IncomingCookie::Absent | IncomingCookie::Malformed => None,
        }
    }
}

/// State of a single request as seen by the session scheme.
///
/// Created with [`SessionScheme::request_context`]. Cookie changes made
/// through the bound [`SessionHandle`] are visible to later calls on the
/// same context.
#[derive(Debug)]
pub struct RequestContext {
    pub(crate) path_and_query: String,
    pub(crate) cookies: Arc<Mutex<CookieState>>,
    pub(crate) session: OnceLock<SessionHandle>,
}

impl RequestContext {
    pub(crate) fn new(path_and_query: impl Into<String>, current: IncomingCookie) -> Self {
        Self {
            path_and_query: path_and_query.into(),
            cookies: Arc::new(Mutex::new(CookieState {
                current,
                pending: None,
            })),
            session: OnceLock::new(),
        }
    }

    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    /// The session capability, once a scheme has been bound.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.get()
    }

    pub(crate) async fn current_cookie(&self) -> IncomingCookie {
        self.cookies.lock().await.current.clone()
    }

    /// Takes the staged cookie change, leaving nothing pending.
    pub async fn take_cookie_change(&self) -> Option<CookieChange> {
        self.cookies.lock().await.pending.take()
    }
}

/// Handle for issuing and clearing the session of the current request.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) scheme: SessionScheme,
    pub(crate) cookies: Arc<Mutex<CookieState>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Stores `payload` as the session record and stages the session cookie.
    ///
    /// The current identifier is reused when the request carried a valid
    /// one; otherwise a fresh identifier is issued.
    #[tracing::instrument(skip(self, payload))]
    pub async fn set(&self, payload: Value) -> Result<SessionId, SchemeError> {
        if !payload.is_object() {
            return Err(SchemeError::InvalidPayload(
                "Session payload must be a JSON object".to_string(),
            ));
        }

        let mut cookies = self.cookies.lock().await;
        let session_id = match &cookies.current {
            IncomingCookie::Present(session_id) => session_id.clone(),
            IncomingCookie::Absent | IncomingCookie::Malformed => {
                let session_id = self.scheme.generate_id()?;
                tracing::debug!("Issuing new session");
                session_id
            }
        };

        self.scheme.write_session(&session_id, &payload).await?;

        // Re-staged on reuse too, so the cookie max-age slides with the record
        cookies.pending = Some(CookieChange::Set(self.scheme.seal(&session_id)?));
        cookies.current = IncomingCookie::Present(session_id.clone());

        Ok(session_id)
    }

    /// Forgets the session: stages a clearing cookie and removes the record.
    ///
    /// The cookie is cleared even if removing the record fails; the store
    /// error is still returned.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), SchemeError> {
        let forgotten = self.cookies.lock().await.forget();

        if let Some(session_id) = forgotten {
            self.scheme.remove_session(&session_id).await?;
        }
        Ok(())
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        match &self.cookies.lock().await.current {
            IncomingCookie::Present(session_id) => Some(session_id.clone()),
            IncomingCookie::Absent | IncomingCookie::Malformed => None,
        }
    }
}
