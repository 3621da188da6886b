use chrono::{DateTime, TimeDelta, Utc};
use headers::HeaderMapExt;
use http::header::{HeaderMap, SET_COOKIE};

use crate::config::SchemeConfig;
use crate::utils::UtilError;

/// Attributes of the outgoing session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub name: String,
    pub path: String,
    pub is_secure: bool,
    pub is_http_only: bool,
    pub max_age: u64,
}

impl From<&SchemeConfig> for CookieOptions {
    fn from(config: &SchemeConfig) -> Self {
        Self {
            name: config.cookie_name().to_string(),
            path: "/".to_string(),
            is_secure: config.is_secure(),
            is_http_only: config.is_http_only(),
            max_age: config.ttl_secs(),
        }
    }
}

/// Raw value of cookie `name` from the request's `Cookie` header(s).
pub(crate) fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let Some(cookies) = headers.typed_get::<headers::Cookie>() else {
        tracing::debug!("No cookie header found");
        return None;
    };

    let value = cookies.get(name).map(str::to_string);
    if value.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", name);
    }
    value
}

pub(crate) fn header_set_cookie<'a>(
    headers: &'a mut HeaderMap,
    options: &CookieOptions,
    value: &str,
) -> Result<&'a HeaderMap, UtilError> {
    let out_of_range = || UtilError::Cookie("Cookie max-age out of range".to_string());
    let max_age = i64::try_from(options.max_age).map_err(|_| out_of_range())?;
    let expires_at = TimeDelta::try_seconds(max_age)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(out_of_range)?;
    append_cookie(headers, options, value, expires_at, max_age)
}

pub(crate) fn header_clear_cookie<'a>(
    headers: &'a mut HeaderMap,
    options: &CookieOptions,
) -> Result<&'a HeaderMap, UtilError> {
    append_cookie(headers, options, "", DateTime::<Utc>::UNIX_EPOCH, 0)
}

fn append_cookie<'a>(
    headers: &'a mut HeaderMap,
    options: &CookieOptions,
    value: &str,
    expires_at: DateTime<Utc>,
    max_age: i64,
) -> Result<&'a HeaderMap, UtilError> {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; Expires={}; SameSite=Lax",
        options.name,
        value,
        options.path,
        max_age,
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    if options.is_secure {
        cookie.push_str("; Secure");
    }
    if options.is_http_only {
        cookie.push_str("; HttpOnly");
    }

    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}
