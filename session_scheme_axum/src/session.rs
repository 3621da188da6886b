use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use http::{StatusCode, request::Parts};
use serde_json::Value;
use std::ops::Deref;

use session_scheme::SessionHandle;

/// Rejection for the session extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// The request did not authenticate.
    Unauthorized,
    /// No session middleware ran for this route.
    MissingLayer,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            Self::MissingLayer => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session middleware is not installed on this route",
            )
                .into_response(),
        }
    }
}

/// Credentials of an authenticated request.
///
/// Present when [`require_session`](crate::require_session) or
/// [`try_session`](crate::try_session) authenticated the request. Extract
/// `Option<AuthCredentials>` on routes where authentication is optional.
///
/// ```no_run
/// use axum::{Router, routing::get};
/// use session_scheme_axum::AuthCredentials;
///
/// async fn home(AuthCredentials(credentials): AuthCredentials) -> String {
///     format!("sup, {}", credentials["user"].as_str().unwrap_or_default())
/// }
///
/// let app: Router = Router::new().route("/", get(home));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AuthCredentials(pub Value);

impl<S> FromRequestParts<S> for AuthCredentials
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCredentials>()
            .cloned()
            .ok_or_else(|| {
                tracing::debug!("No credentials on request");
                SessionRejection::Unauthorized
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthCredentials
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthCredentials>().cloned())
    }
}

/// The session capability of the current request: `set` and `clear`.
#[derive(Clone, Debug)]
pub struct Session(pub SessionHandle);

impl Deref for Session {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session extractor used on a route without session middleware");
            SessionRejection::MissingLayer
        })
    }
}
