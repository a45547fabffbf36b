//! TOML file configuration structures.
//!
//! These structs directly map to the `rally-config.toml` file format.

use rally_sdk::token::DEFAULT_TOKEN_TTL;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Bearer token section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base64 HMAC key. If empty, a random key is generated and the config
    /// file is rewritten.
    #[serde(default)]
    pub token_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: DEFAULT_TOKEN_TTL,
        }
    }
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL
}

/// Event status section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Minutes after its start an event is reported as ongoing.
    #[serde(default = "default_ongoing_window")]
    pub ongoing_window_minutes: i64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ongoing_window_minutes: default_ongoing_window(),
        }
    }
}

fn default_ongoing_window() -> i64 {
    120
}

/// CORS section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser. Empty allows any.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl FileConfig {
    /// Whether a token secret still has to be generated.
    pub fn needs_secret(&self) -> bool {
        self.auth.token_secret.trim().is_empty()
    }
}
