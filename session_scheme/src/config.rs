//! Scheme configuration: caller-facing options and the validated settings
//! derived from them.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SchemeError;
use crate::session::SessionValidator;

/// Session lifetime used when no TTL (or a zero TTL) is supplied: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1000 * 60 * 60 * 24);

/// Longest accepted session lifetime: 100 years. Longer lifetimes cannot be
/// turned into cookie and store expiry timestamps.
pub const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 36525);

/// Cookie name used when none is supplied.
pub const DEFAULT_COOKIE_NAME: &str = "sid";

/// Query parameter used when `append_next` is enabled with a plain `true`.
pub const DEFAULT_NEXT_PARAM: &str = "next";

/// A secret that never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

/// How the originally requested path is appended to a login redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendNext {
    /// `true` appends under [`DEFAULT_NEXT_PARAM`], `false` disables.
    Flag(bool),
    /// Append under a custom query parameter name.
    Param(String),
}

impl AppendNext {
    fn into_param(self) -> Option<String> {
        match self {
            Self::Flag(true) => Some(DEFAULT_NEXT_PARAM.to_string()),
            Self::Flag(false) => None,
            Self::Param(name) if name.is_empty() => None,
            Self::Param(name) => Some(name),
        }
    }
}

impl From<bool> for AppendNext {
    fn from(enabled: bool) -> Self {
        Self::Flag(enabled)
    }
}

impl From<&str> for AppendNext {
    fn from(param: &str) -> Self {
        Self::Param(param.to_string())
    }
}

impl From<String> for AppendNext {
    fn from(param: String) -> Self {
        Self::Param(param)
    }
}

/// How the session identifier is protected inside the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookieEncoding {
    /// Encrypted and authenticated (AES-256-GCM).
    #[default]
    Sealed,
    /// Readable but tamper-evident (HMAC-SHA256).
    Signed,
}

impl FromStr for CookieEncoding {
    type Err = SchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sealed" | "iron" => Ok(Self::Sealed),
            "signed" => Ok(Self::Signed),
            other => Err(SchemeError::Configuration(format!(
                "Unsupported cookie encoding: {other}. Supported encodings are 'sealed' and 'signed'"
            ))),
        }
    }
}

/// Which expiry the store applies when a session record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreTtl {
    /// Use the expiry the store was constructed with, renewed on every write.
    #[default]
    StoreDefault,
    /// Pass the scheme TTL with every write.
    PerWrite,
}

/// Caller-supplied options. Turned into a [`SchemeConfig`] with
/// `SchemeConfig::try_from`.
#[derive(Clone, Default)]
pub struct SchemeOptions {
    pub password: Option<String>,
    pub ttl: Option<Duration>,
    pub cookie: Option<String>,
    pub is_secure: Option<bool>,
    pub is_http_only: Option<bool>,
    pub encoding: Option<CookieEncoding>,
    pub validate_func: Option<Arc<dyn SessionValidator>>,
    pub clear_invalid: bool,
    pub redirect_to: Option<String>,
    pub append_next: Option<AppendNext>,
    pub store_ttl: StoreTtl,
}

impl fmt::Debug for SchemeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeOptions")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .field("cookie", &self.cookie)
            .field("is_secure", &self.is_secure)
            .field("is_http_only", &self.is_http_only)
            .field("encoding", &self.encoding)
            .field("validate_func", &self.validate_func.is_some())
            .field("clear_invalid", &self.clear_invalid)
            .field("redirect_to", &self.redirect_to)
            .field("append_next", &self.append_next)
            .field("store_ttl", &self.store_ttl)
            .finish()
    }
}

impl SchemeOptions {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cookie(mut self, name: impl Into<String>) -> Self {
        self.cookie = Some(name.into());
        self
    }

    pub fn secure(mut self, is_secure: bool) -> Self {
        self.is_secure = Some(is_secure);
        self
    }

    pub fn http_only(mut self, is_http_only: bool) -> Self {
        self.is_http_only = Some(is_http_only);
        self
    }

    pub fn encoding(mut self, encoding: CookieEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn validate_func(mut self, validator: impl SessionValidator + 'static) -> Self {
        self.validate_func = Some(Arc::new(validator));
        self
    }

    pub fn clear_invalid(mut self, clear_invalid: bool) -> Self {
        self.clear_invalid = clear_invalid;
        self
    }

    pub fn redirect_to(mut self, uri: impl Into<String>) -> Self {
        self.redirect_to = Some(uri.into());
        self
    }

    pub fn append_next(mut self, append_next: impl Into<AppendNext>) -> Self {
        self.append_next = Some(append_next.into());
        self
    }

    pub fn store_ttl(mut self, store_ttl: StoreTtl) -> Self {
        self.store_ttl = store_ttl;
        self
    }

    /// Reads options from `SESSION_*` environment variables.
    ///
    /// Validation is deferred to `SchemeConfig::try_from`, except for values
    /// that cannot be parsed at all.
    pub fn from_env() -> Result<Self, SchemeError> {
        let ttl = match env::var("SESSION_TTL_MS") {
            Ok(value) => Some(Duration::from_millis(value.parse::<u64>().map_err(|_| {
                SchemeError::Configuration(format!(
                    "SESSION_TTL_MS must be a number of milliseconds, got '{value}'"
                ))
            })?)),
            Err(_) => None,
        };

        let encoding = env::var("SESSION_COOKIE_ENCODING")
            .ok()
            .map(|value| value.parse())
            .transpose()?;

        let append_next = env::var("SESSION_APPEND_NEXT")
            .ok()
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" => AppendNext::Flag(true),
                "false" | "" => AppendNext::Flag(false),
                _ => AppendNext::Param(value),
            });

        Ok(Self {
            password: env::var("SESSION_PASSWORD").ok(),
            ttl,
            cookie: env::var("SESSION_COOKIE_NAME").ok(),
            is_secure: env_flag("SESSION_COOKIE_SECURE"),
            is_http_only: env_flag("SESSION_COOKIE_HTTP_ONLY"),
            encoding,
            validate_func: None,
            clear_invalid: env_flag("SESSION_CLEAR_INVALID").unwrap_or(false),
            redirect_to: env::var("SESSION_REDIRECT_TO").ok(),
            append_next,
            store_ttl: StoreTtl::default(),
        })
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|val| val.to_lowercase() != "false")
}

/// Validated, immutable scheme settings.
#[derive(Clone)]
pub struct SchemeConfig {
    pub(crate) password: SecretString,
    pub(crate) ttl: Duration,
    pub(crate) cookie_name: String,
    pub(crate) is_secure: bool,
    pub(crate) is_http_only: bool,
    pub(crate) encoding: CookieEncoding,
    pub(crate) validator: Option<Arc<dyn SessionValidator>>,
    pub(crate) clear_invalid: bool,
    pub(crate) redirect_to: Option<String>,
    pub(crate) append_next: Option<String>,
    pub(crate) store_ttl: StoreTtl,
}

impl fmt::Debug for SchemeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeConfig")
            .field("password", &self.password)
            .field("ttl", &self.ttl)
            .field("cookie_name", &self.cookie_name)
            .field("is_secure", &self.is_secure)
            .field("is_http_only", &self.is_http_only)
            .field("encoding", &self.encoding)
            .field("validator", &self.validator.is_some())
            .field("clear_invalid", &self.clear_invalid)
            .field("redirect_to", &self.redirect_to)
            .field("append_next", &self.append_next)
            .field("store_ttl", &self.store_ttl)
            .finish()
    }
}

impl TryFrom<SchemeOptions> for SchemeConfig {
    type Error = SchemeError;

    fn try_from(options: SchemeOptions) -> Result<Self, Self::Error> {
        let password = match options.password {
            Some(password) if !password.is_empty() => SecretString::new(password),
            _ => {
                return Err(SchemeError::Configuration(
                    "Missing required password in options".to_string(),
                ));
            }
        };

        let redirect_to = options.redirect_to.filter(|uri| !uri.is_empty());
        if let Some(uri) = &redirect_to {
            validate_redirect_to(uri)?;
        }

        let append_next = options.append_next.and_then(AppendNext::into_param);
        if append_next.is_some() && redirect_to.is_none() {
            return Err(SchemeError::Configuration(
                "Cannot set appendNext without redirectTo".to_string(),
            ));
        }

        let ttl = options
            .ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(DEFAULT_TTL);
        if ttl > MAX_TTL {
            return Err(SchemeError::Configuration(format!(
                "TTL of {}s exceeds the maximum of {}s",
                ttl.as_secs(),
                MAX_TTL.as_secs()
            )));
        }

        let cookie_name = options
            .cookie
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        Ok(Self {
            password,
            ttl,
            cookie_name,
            is_secure: options.is_secure != Some(false),
            is_http_only: options.is_http_only != Some(false),
            encoding: options.encoding.unwrap_or_default(),
            validator: options.validate_func,
            clear_invalid: options.clear_invalid,
            redirect_to,
            append_next,
            store_ttl: options.store_ttl,
        })
    }
}

/// Accepts absolute URLs and relative references. Scheme-relative references
/// (`//host`) and values containing whitespace are rejected.
fn validate_redirect_to(uri: &str) -> Result<(), SchemeError> {
    let invalid =
        |reason: &str| SchemeError::Configuration(format!("Invalid redirectTo '{uri}': {reason}"));

    if uri.chars().take_while(|c| matches!(c, '/' | '\\')).count() >= 2 {
        return Err(invalid("scheme-relative references are not allowed"));
    }
    if uri.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("contains whitespace or control characters"));
    }

    let base = url::Url::parse("http://localhost/").map_err(|e| invalid(&e.to_string()))?;
    url::Url::options()
        .base_url(Some(&base))
        .parse(uri)
        .map(|_| ())
        .map_err(|e| invalid(&e.to_string()))
}

impl SchemeConfig {
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// TTL rounded up to whole seconds, as cookies and cache stores expect.
    pub fn ttl_secs(&self) -> u64 {
        let secs = self.ttl.as_secs();
        if self.ttl.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn is_secure(&self) -> bool {
        self.is_secure
    }

    pub fn is_http_only(&self) -> bool {
        self.is_http_only
    }

    pub fn encoding(&self) -> CookieEncoding {
        self.encoding
    }

    pub fn validator(&self) -> Option<&Arc<dyn SessionValidator>> {
        self.validator.as_ref()
    }

    pub fn clear_invalid(&self) -> bool {
        self.clear_invalid
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn append_next(&self) -> Option<&str> {
        self.append_next.as_deref()
    }

    pub fn store_ttl(&self) -> StoreTtl {
        self.store_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Validation, ValidatorError};
    use serde_json::Value;
    use serial_test::serial;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original: Vec<_> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), env::var(key).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(val) => unsafe { env::set_var(key, val) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = test();

        for (key, value) in original {
            match value {
                Some(val) => unsafe { env::set_var(&key, val) },
                None => unsafe { env::remove_var(&key) },
            }
        }

        result
    }

    #[test]
    fn test_defaults() {
        let config = SchemeConfig::try_from(SchemeOptions::new("testing")).unwrap();

        assert_eq!(config.ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.cookie_name(), "sid");
        assert!(config.is_secure());
        assert!(config.is_http_only());
        assert_eq!(config.encoding(), CookieEncoding::Sealed);
        assert!(config.validator().is_none());
        assert!(!config.clear_invalid());
        assert_eq!(config.redirect_to(), None);
        assert_eq!(config.append_next(), None);
        assert_eq!(config.store_ttl(), StoreTtl::StoreDefault);
    }

    #[test]
    fn test_missing_password() {
        let result = SchemeConfig::try_from(SchemeOptions::default());
        assert!(matches!(result, Err(SchemeError::Configuration(_))));
    }

    #[test]
    fn test_empty_password() {
        let result = SchemeConfig::try_from(SchemeOptions::new(""));
        assert!(matches!(result, Err(SchemeError::Configuration(_))));
    }

    #[test]
    fn test_append_next_without_redirect_to() {
        let result = SchemeConfig::try_from(SchemeOptions::new("testing").append_next(true));
        match result {
            Err(SchemeError::Configuration(msg)) => {
                assert_eq!(msg, "Cannot set appendNext without redirectTo");
            }
            other => panic!("Expected configuration error, got: {other:?}"),
        }
    }

    #[test]
    fn test_append_next_false_without_redirect_to_is_allowed() {
        let config =
            SchemeConfig::try_from(SchemeOptions::new("testing").append_next(false)).unwrap();
        assert_eq!(config.append_next(), None);
    }

    #[test]
    fn test_append_next_normalization() {
        let flag = SchemeConfig::try_from(
            SchemeOptions::new("testing")
                .redirect_to("/login")
                .append_next(true),
        )
        .unwrap();
        assert_eq!(flag.append_next(), Some("next"));

        let custom = SchemeConfig::try_from(
            SchemeOptions::new("testing")
                .redirect_to("/login")
                .append_next("return_to"),
        )
        .unwrap();
        assert_eq!(custom.append_next(), Some("return_to"));

        let empty = SchemeConfig::try_from(
            SchemeOptions::new("testing")
                .redirect_to("/login")
                .append_next(""),
        )
        .unwrap();
        assert_eq!(empty.append_next(), None);
    }

    #[test]
    fn test_zero_ttl_falls_back_to_default() {
        let config =
            SchemeConfig::try_from(SchemeOptions::new("testing").ttl(Duration::ZERO)).unwrap();
        assert_eq!(config.ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_ttl_above_maximum_is_rejected() {
        for ttl in [MAX_TTL + Duration::from_secs(1), Duration::from_secs(10_000_000_000_000)] {
            assert!(matches!(
                SchemeConfig::try_from(SchemeOptions::new("testing").ttl(ttl)),
                Err(SchemeError::Configuration(_))
            ));
        }

        let config = SchemeConfig::try_from(SchemeOptions::new("testing").ttl(MAX_TTL)).unwrap();
        assert_eq!(config.ttl(), MAX_TTL);
    }

    #[test]
    fn test_ttl_secs_rounds_up() {
        let config =
            SchemeConfig::try_from(SchemeOptions::new("testing").ttl(Duration::from_millis(1500)))
                .unwrap();
        assert_eq!(config.ttl_secs(), 2);
    }

    #[test]
    fn test_security_flags_only_disabled_explicitly() {
        let config = SchemeConfig::try_from(
            SchemeOptions::new("testing")
                .secure(false)
                .http_only(false),
        )
        .unwrap();
        assert!(!config.is_secure());
        assert!(!config.is_http_only());
    }

    #[test]
    fn test_empty_cookie_name_uses_default() {
        let config = SchemeConfig::try_from(SchemeOptions::new("testing").cookie("")).unwrap();
        assert_eq!(config.cookie_name(), "sid");
    }

    #[test]
    fn test_redirect_to_validation() {
        for uri in [
            "/login",
            "/login?from=app",
            "https://example.com/login",
            "login",
            "../login",
            "login?from=app",
        ] {
            assert!(
                SchemeConfig::try_from(SchemeOptions::new("testing").redirect_to(uri)).is_ok(),
                "{uri} should be accepted"
            );
        }

        for uri in [
            "login page",
            "//evil.example.com",
            "\\\\evil.example.com",
            "/\\evil.example.com",
            "/login\r\nX-Injected: 1",
            "http://[::1",
        ] {
            assert!(
                matches!(
                    SchemeConfig::try_from(SchemeOptions::new("testing").redirect_to(uri)),
                    Err(SchemeError::Configuration(_))
                ),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn test_validator_is_kept() {
        let options = SchemeOptions::new("testing").validate_func(|_item: Value| async {
            Ok::<_, ValidatorError>(Validation::valid())
        });
        let config = SchemeConfig::try_from(options).unwrap();
        assert!(config.validator().is_some());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = SchemeConfig::try_from(SchemeOptions::new("super-secret")).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));

        let options = SchemeOptions::new("super-secret");
        assert!(!format!("{options:?}").contains("super-secret"));
    }

    #[test]
    fn test_parse_cookie_encoding() {
        assert_eq!("sealed".parse::<CookieEncoding>().unwrap(), CookieEncoding::Sealed);
        assert_eq!("SIGNED".parse::<CookieEncoding>().unwrap(), CookieEncoding::Signed);
        assert!("plain".parse::<CookieEncoding>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        with_env_vars(
            &[
                ("SESSION_PASSWORD", Some("from-env")),
                ("SESSION_TTL_MS", Some("60000")),
                ("SESSION_COOKIE_NAME", Some("app_sid")),
                ("SESSION_COOKIE_SECURE", Some("false")),
                ("SESSION_COOKIE_HTTP_ONLY", None),
                ("SESSION_COOKIE_ENCODING", Some("signed")),
                ("SESSION_CLEAR_INVALID", Some("true")),
                ("SESSION_REDIRECT_TO", Some("/login")),
                ("SESSION_APPEND_NEXT", Some("true")),
            ],
            || {
                let config = SchemeConfig::try_from(SchemeOptions::from_env().unwrap()).unwrap();
                assert_eq!(config.ttl(), Duration::from_secs(60));
                assert_eq!(config.cookie_name(), "app_sid");
                assert!(!config.is_secure());
                assert!(config.is_http_only());
                assert_eq!(config.encoding(), CookieEncoding::Signed);
                assert!(config.clear_invalid());
                assert_eq!(config.redirect_to(), Some("/login"));
                assert_eq!(config.append_next(), Some("next"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_custom_next_param() {
        with_env_vars(
            &[
                ("SESSION_PASSWORD", Some("from-env")),
                ("SESSION_TTL_MS", None),
                ("SESSION_COOKIE_ENCODING", None),
                ("SESSION_REDIRECT_TO", Some("/login")),
                ("SESSION_APPEND_NEXT", Some("return_to")),
            ],
            || {
                let options = SchemeOptions::from_env().unwrap();
                assert_eq!(
                    options.append_next,
                    Some(AppendNext::Param("return_to".to_string()))
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_ttl() {
        with_env_vars(&[("SESSION_TTL_MS", Some("a day"))], || {
            assert!(matches!(
                SchemeOptions::from_env(),
                Err(SchemeError::Configuration(_))
            ));
        });
    }
}
