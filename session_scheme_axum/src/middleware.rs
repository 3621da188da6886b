use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use session_scheme::{
    AuthMode, AuthOutcome, RequestContext, SchemeError, SessionScheme, Unauthenticated,
    UnauthenticatedResponse,
};

use super::error::IntoResponseError;
use super::session::{AuthCredentials, Session};

/// Authenticates the request; unauthenticated requests get a 401 or the
/// configured redirect and never reach the handler.
pub async fn require_session(
    State(scheme): State<SessionScheme>,
    req: Request,
    next: Next,
) -> Response {
    run_session(scheme, AuthMode::Required, req, next).await
}

/// Authenticates the request but always runs the handler.
/// [`AuthCredentials`] is only present when authentication succeeded.
pub async fn try_session(State(scheme): State<SessionScheme>, req: Request, next: Next) -> Response {
    run_session(scheme, AuthMode::Try, req, next).await
}

/// Binds the [`Session`] capability without authenticating.
pub async fn bind_session(
    State(scheme): State<SessionScheme>,
    req: Request,
    next: Next,
) -> Response {
    run_session(scheme, AuthMode::Optional, req, next).await
}

async fn run_session(scheme: SessionScheme, mode: AuthMode, mut req: Request, next: Next) -> Response {
    if req.extensions().get::<Session>().is_some() {
        tracing::error!("Session middleware installed more than once for {}", req.uri());
        return error_response(SchemeError::AlreadyBound);
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path(), |pq| pq.as_str())
        .to_string();
    let ctx = scheme.request_context(req.headers(), &path_and_query);

    let session = match scheme.extend(&ctx) {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };
    req.extensions_mut().insert(Session(session));

    if mode != AuthMode::Optional {
        match scheme.authenticate(&ctx).await {
            Ok(AuthOutcome::Authenticated(credentials)) => {
                req.extensions_mut().insert(AuthCredentials(credentials));
            }
            Ok(AuthOutcome::Unauthenticated(outcome)) if mode == AuthMode::Required => {
                let response = unauthenticated_response(&outcome);
                return with_cookie_headers(&scheme, &ctx, response).await;
            }
            Ok(AuthOutcome::Unauthenticated(outcome)) => {
                tracing::debug!("Continuing without credentials: {}", outcome.reason);
            }
            Err(e) => {
                tracing::error!("Session authentication failed: {}", e);
                return with_cookie_headers(&scheme, &ctx, error_response(e)).await;
            }
        }
    }

    let response = next.run(req).await;
    with_cookie_headers(&scheme, &ctx, response).await
}

fn unauthenticated_response(outcome: &Unauthenticated) -> Response {
    if let Some(diagnostic) = &outcome.diagnostic {
        tracing::warn!("Unauthenticated with cleanup failure: {}", diagnostic);
    }

    match &outcome.response {
        UnauthenticatedResponse::Unauthorized => {
            tracing::debug!("Unauthorized: {}", outcome.reason);
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
        UnauthenticatedResponse::Redirect(uri) => {
            tracing::debug!("Redirecting to {}: {}", uri, outcome.reason);
            Redirect::temporary(uri).into_response()
        }
    }
}

fn error_response(e: SchemeError) -> Response {
    Err::<Response, _>(e)
        .into_response_error()
        .unwrap_or_else(IntoResponse::into_response)
}

async fn with_cookie_headers(
    scheme: &SessionScheme,
    ctx: &RequestContext,
    mut response: Response,
) -> Response {
    if let Err(e) = scheme
        .write_cookie_headers(ctx, response.headers_mut())
        .await
    {
        tracing::error!("Failed to write session cookie: {}", e);
        return error_response(e);
    }
    response
}
