//! Token signing configuration.

use rally_sdk::token::DEFAULT_TOKEN_TTL;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens.
    secret: Box<[u8]>,
    /// Lifetime of issued tokens, in seconds.
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Box<[u8]>>, token_ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            token_ttl_secs,
        }
    }

    /// Get the secret key bytes for HMAC signing.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl Default for AuthConfig {
    /// A fixed development key. Never used by the server binary, which
    /// always loads or generates a secret.
    fn default() -> Self {
        Self::new(b"rally-development-secret".to_vec(), DEFAULT_TOKEN_TTL)
    }
}
