//! HTTP API.
//!
//! - `/api/auth/*`   – sessions, see [`auth`]
//! - `/api/events/*` – events, see [`events`]
//! - `/ws`           – live notifications, see [`ws`]

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod auth;
pub mod error;
pub mod events;
pub mod extractors;
pub mod ws;

/// Build the REST and WebSocket routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/events", events::router())
        .route("/ws", get(ws::live_ws))
}
