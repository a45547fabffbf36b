//! Application state shared across all request handlers.

use rally_core::config::SharedConfig;
use rally_core::events::Broadcaster;
use rally_core::services::{AuthService, EventService};
use rally_core::store::EventStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Live connections and event rooms.
    pub broadcaster: Broadcaster,
    pub auth: AuthService,
    pub events: EventService,
}

impl AppState {
    /// Wire the services over `store`.
    pub fn new(store: Arc<dyn EventStore>, config: SharedConfig) -> Self {
        let broadcaster = Broadcaster::new();
        let auth = AuthService::new(store.clone(), config.auth.clone());
        let events = EventService::new(store, broadcaster.clone(), config.events.clone());
        Self {
            config,
            broadcaster,
            auth,
            events,
        }
    }
}
