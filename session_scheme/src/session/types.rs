use serde_json::Value;
use std::fmt;

/// Opaque session identifier carried (sealed) in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub const MIN_LEN: usize = 16;
    pub const MAX_LEN: usize = 128;

    /// Accepts only identifiers shaped like the ones this crate issues:
    /// base64url characters within the length bounds.
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = (Self::MIN_LEN..=Self::MAX_LEN).contains(&value.len())
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an integration does with requests that fail authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Unauthenticated requests get the unauthorized or redirect response.
    #[default]
    Required,
    /// Authenticate, but let the handler run either way.
    Try,
    /// Only bind the session capability; skip authentication.
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Value),
    Unauthenticated(Unauthenticated),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn credentials(&self) -> Option<&Value> {
        match self {
            Self::Authenticated(credentials) => Some(credentials),
            Self::Unauthenticated(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unauthenticated {
    pub reason: UnauthenticatedReason,
    pub response: UnauthenticatedResponse,
    /// Stored item of a session that failed validation, for logging.
    pub item: Option<Value>,
    /// Cleanup failure that happened while producing this outcome.
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingCookie,
    InvalidCookie,
    SessionNotFound,
    FailedValidation,
    ValidatorError(String),
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCookie => f.write_str("Missing session cookie"),
            Self::InvalidCookie => f.write_str("Invalid session cookie"),
            Self::SessionNotFound => f.write_str("Session not found"),
            Self::FailedValidation => f.write_str("Failed validation"),
            Self::ValidatorError(msg) => write!(f, "Validator error: {msg}"),
        }
    }
}

/// Client-visible outcome of an unauthenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedResponse {
    Unauthorized,
    Redirect(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parse() {
        let id = "Q2h1bmt5U2Vzc2lvbklkZW50aWZpZXIxMjM0NTY3ODk";
        assert_eq!(SessionId::parse(id).unwrap().as_str(), id);
    }

    #[test]
    fn test_session_id_rejects_malformed() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("short").is_none());
        assert!(SessionId::parse(&"a".repeat(SessionId::MAX_LEN + 1)).is_none());
        assert!(SessionId::parse("has spaces in the identifier!!").is_none());
        assert!(SessionId::parse("cache:session:aaaaaaaaaaaaaaaa").is_none());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            UnauthenticatedReason::SessionNotFound.to_string(),
            "Session not found"
        );
        assert_eq!(
            UnauthenticatedReason::ValidatorError("timeout".to_string()).to_string(),
            "Validator error: timeout"
        );
    }

    #[test]
    fn test_outcome_credentials() {
        let outcome = AuthOutcome::Authenticated(serde_json::json!({ "user": "nathan" }));
        assert!(outcome.is_authenticated());
        assert_eq!(outcome.credentials().unwrap()["user"], "nathan");

        let outcome = AuthOutcome::Unauthenticated(Unauthenticated {
            reason: UnauthenticatedReason::MissingCookie,
            response: UnauthenticatedResponse::Unauthorized,
            item: None,
            diagnostic: None,
        });
        assert!(!outcome.is_authenticated());
        assert!(outcome.credentials().is_none());
    }
}
