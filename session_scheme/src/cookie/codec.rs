//! Cookie value codecs.
//!
//! A codec turns a session identifier into a cookie value the client can
//! neither forge nor (for the sealed codec) read, and back.

use hmac::{Hmac, Mac};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::{CookieEncoding, SchemeConfig, SecretString};
use crate::errors::SchemeError;
use crate::utils::{base64url_decode, base64url_encode, gen_random_bytes};

type HmacSha256 = Hmac<Sha256>;

pub trait CookieCodec: Send + Sync {
    /// Encode a session identifier into a cookie value.
    fn seal(&self, session_id: &str) -> Result<String, SchemeError>;

    /// Decode a cookie value. `None` means tampered, foreign or malformed.
    fn unseal(&self, cookie_value: &str) -> Option<String>;
}

pub(crate) fn codec_for(config: &SchemeConfig) -> Result<Arc<dyn CookieCodec>, SchemeError> {
    Ok(match config.encoding() {
        CookieEncoding::Sealed => Arc::new(SealedCookieCodec::new(&config.password)?),
        CookieEncoding::Signed => Arc::new(SignedCookieCodec::new(&config.password)),
    })
}

/// AES-256-GCM codec. The key is the SHA-256 digest of the password; each
/// seal uses a fresh random nonce, so equal identifiers seal differently.
///
/// Format: `base64url(nonce || ciphertext || tag)`.
pub struct SealedCookieCodec {
    key: LessSafeKey,
}

impl SealedCookieCodec {
    pub fn new(password: &SecretString) -> Result<Self, SchemeError> {
        let digest = Sha256::digest(password.expose_secret().as_bytes());
        let unbound = UnboundKey::new(&AES_256_GCM, digest.as_slice())
            .map_err(|_| SchemeError::Crypto("Failed to derive cookie sealing key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
        })
    }
}

impl CookieCodec for SealedCookieCodec {
    fn seal(&self, session_id: &str) -> Result<String, SchemeError> {
        let nonce_bytes = gen_random_bytes(NONCE_LEN)?;
        let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes)
            .map_err(|_| SchemeError::Crypto("Invalid nonce length".to_string()))?;

        let mut in_out = session_id.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| SchemeError::Crypto("Failed to seal cookie value".to_string()))?;

        let mut sealed = nonce_bytes;
        sealed.extend_from_slice(&in_out);
        Ok(base64url_encode(&sealed))
    }

    fn unseal(&self, cookie_value: &str) -> Option<String> {
        let decoded = base64url_decode(cookie_value).ok()?;
        if decoded.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return None;
        }

        let (nonce_bytes, ciphertext) = decoded.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).ok()?;
        let mut in_out = ciphertext.to_vec();

        let Ok(plaintext) = self.key.open_in_place(nonce, Aad::empty(), &mut in_out) else {
            tracing::warn!("Session cookie failed to unseal");
            return None;
        };
        String::from_utf8(plaintext.to_vec()).ok()
    }
}

/// HMAC-SHA256 codec. The identifier stays readable; the signature makes it
/// tamper-evident.
///
/// Format: `{session_id}.{base64url(signature)}`.
pub struct SignedCookieCodec {
    secret: SecretString,
}

impl SignedCookieCodec {
    pub fn new(password: &SecretString) -> Self {
        Self {
            secret: password.clone(),
        }
    }

    fn signature(&self, message: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(message);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

impl CookieCodec for SignedCookieCodec {
    fn seal(&self, session_id: &str) -> Result<String, SchemeError> {
        let signature = self
            .signature(session_id.as_bytes())
            .ok_or_else(|| SchemeError::Crypto("Failed to sign cookie value".to_string()))?;
        Ok(format!("{session_id}.{}", base64url_encode(&signature)))
    }

    fn unseal(&self, cookie_value: &str) -> Option<String> {
        let (session_id, signature) = cookie_value.rsplit_once('.')?;
        let actual = base64url_decode(signature).ok()?;
        let expected = self.signature(session_id.as_bytes())?;

        if expected.ct_eq(&actual).into() {
            Some(session_id.to_string())
        } else {
            tracing::warn!(
                "Session cookie signature mismatch, cookie prefix: {}...",
                cookie_value.chars().take(8).collect::<String>()
            );
            None
        }
    }
}
