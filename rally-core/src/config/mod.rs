//! Configuration types for the Rally server.
//!
//! These types represent the validated runtime configuration and can be
//! shared across crates. The actual config loading/parsing is handled by
//! the server crate.

mod auth;
mod events;
mod server;

pub use auth::AuthConfig;
pub use events::EventsConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// This allows independent access to different configuration sections
/// without blocking other readers/writers.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, CORS origins).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Token signing configuration.
    pub auth: Arc<RwLock<AuthConfig>>,
    /// Event status derivation.
    pub events: Arc<RwLock<EventsConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, auth: AuthConfig, events: EventsConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            auth: Arc::new(RwLock::new(auth)),
            events: Arc::new(RwLock::new(events)),
        }
    }
}
