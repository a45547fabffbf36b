//! Configuration module for rally-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! generating the token secret on first start.

pub mod file;

use crate::config::file::FileConfig;
use rally_core::config::{AuthConfig, EventsConfig, ServerConfig, SharedConfig};
use rand::RngCore;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Length of a generated token secret, in bytes.
const GENERATED_SECRET_LEN: usize = 32;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub events: EventsConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(self.server, self.auth, self.events)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file counts as empty)
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Generate a token secret if none is set (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = ?self.config_path, "Config file not found, using defaults");
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if file_config.needs_secret() {
            file_config.auth.token_secret = generate_secret();
            self.rewrite_config(&file_config)?;
            tracing::info!("Token secret generated and config file updated");
        }

        // CLI overrides are applied after the rewrite so they never persist
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_loaded_config(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn generate_secret() -> String {
    let mut key = [0u8; GENERATED_SECRET_LEN];
    rand::rng().fill_bytes(&mut key);
    fast32::base64::RFC4648_NOPAD.encode(&key)
}

/// One year.
const MAX_ONGOING_WINDOW_MINUTES: i64 = 365 * 24 * 60;

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let secret = fast32::base64::RFC4648_NOPAD
        .decode_str(file_config.auth.token_secret.trim())
        .map_err(|_| {
            ConfigError::ValidationError("auth.token_secret is not valid base64".into())
        })?;
    if secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.token_secret must not be empty".into(),
        ));
    }
    if file_config.auth.token_ttl_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "auth.token_ttl_secs must be positive".into(),
        ));
    }
    if file_config.events.ongoing_window_minutes < 0 {
        return Err(ConfigError::ValidationError(
            "events.ongoing_window_minutes must not be negative".into(),
        ));
    }
    if file_config.events.ongoing_window_minutes > MAX_ONGOING_WINDOW_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "events.ongoing_window_minutes must be at most {MAX_ONGOING_WINDOW_MINUTES}"
        )));
    }

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
            allowed_origins: file_config.cors.allowed_origins,
        },
        auth: AuthConfig::new(secret, file_config.auth.token_ttl_secs),
        events: EventsConfig {
            ongoing_window: time::Duration::minutes(file_config.events.ongoing_window_minutes),
        },
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
