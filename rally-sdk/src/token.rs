//! Bearer token issuing and verification.
//!
//! A token names the user it was issued to and when it stops being valid,
//! and carries an HMAC-SHA256 over both:
//!
//! ```text
//! Authorization: Bearer {user_id}.{expires_at}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{user_id}.{expires_at}", secret)`.
//! Base64 is RFC 4648 without padding.

use uuid::Uuid;

/// Scheme prefix expected in the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Default lifetime of a token (in seconds).
pub const DEFAULT_TOKEN_TTL: i64 = 24 * 60 * 60;

/// Errors produced by token operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

impl From<ring::error::Unspecified> for TokenError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// The authenticated content of a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    /// Unix timestamp after which the token is rejected.
    pub expires_at: i64,
}

fn signing_payload(user_id: Uuid, expires_at: i64) -> String {
    format!("{user_id}.{expires_at}")
}

fn hmac_key(key: &[u8]) -> ring::hmac::Key {
    ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key)
}

/// Issue a token for `user_id` that expires `ttl_secs` from now.
pub fn issue_token(user_id: Uuid, ttl_secs: i64, key: &[u8]) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    issue_token_at(user_id, now, ttl_secs, key)
}

/// Issue a token as if the current time were `now`.
pub fn issue_token_at(user_id: Uuid, now: i64, ttl_secs: i64, key: &[u8]) -> String {
    let expires_at = now.saturating_add(ttl_secs);
    let payload = signing_payload(user_id, expires_at);
    let sig = ring::hmac::sign(&hmac_key(key), payload.as_bytes());
    format!(
        "{payload}.{}",
        fast32::base64::RFC4648_NOPAD.encode(sig.as_ref())
    )
}

/// Verify a token against the current time.
pub fn verify_token(token: &str, key: &[u8]) -> Result<TokenClaims, TokenError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    verify_token_at(token, key, now)
}

/// Verify a token as if the current time were `now`.
///
/// The signature is checked before the expiry so that a forged token never
/// reports `Expired`.
pub fn verify_token_at(token: &str, key: &[u8], now: i64) -> Result<TokenClaims, TokenError> {
    let (payload, encoded_sig) = token.rsplit_once('.').ok_or(TokenError::InvalidFormat)?;
    let (user_part, expires_part) = payload.split_once('.').ok_or(TokenError::InvalidFormat)?;

    let user_id = Uuid::parse_str(user_part).map_err(|_| TokenError::InvalidFormat)?;
    let expires_at: i64 = expires_part
        .parse()
        .map_err(|_| TokenError::InvalidFormat)?;
    let signature = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded_sig)
        .map_err(|_| TokenError::InvalidBase64)?;

    ring::hmac::verify(&hmac_key(key), payload.as_bytes(), &signature)?;

    if now >= expires_at {
        return Err(TokenError::Expired);
    }
    Ok(TokenClaims {
        user_id,
        expires_at,
    })
}

/// Extract the token from an `Authorization` header value.
///
/// Returns `None` unless the value uses the `Bearer` scheme with a
/// non-empty token.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}
