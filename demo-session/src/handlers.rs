use axum::{http::StatusCode, response::Redirect};
use serde_json::json;

use session_scheme_axum::{AuthCredentials, IntoResponseError, Session};

/// Issues a session for the demo user unless the request already has one.
pub(crate) async fn login(
    credentials: Option<AuthCredentials>,
    session: Session,
) -> Result<Redirect, (StatusCode, String)> {
    if credentials.is_none() {
        session
            .set(json!({ "user": "nathan" }))
            .await
            .into_response_error()?;
    }
    Ok(Redirect::temporary("/"))
}

pub(crate) async fn index(AuthCredentials(credentials): AuthCredentials) -> String {
    let user = credentials["user"].as_str().unwrap_or("stranger");
    format!("sup, {user}")
}

pub(crate) async fn logout(session: Session) -> Result<&'static str, (StatusCode, String)> {
    session.clear().await.into_response_error()?;
    Ok("Logged out")
}
