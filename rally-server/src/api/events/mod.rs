//! Events API handlers.
//!
//! Every endpoint except the reads requires a bearer token.
//!
//! # Endpoints
//!
//! - `GET    /`                – list events, earliest first
//! - `POST   /`                – create an event
//! - `GET    /{event_id}`      – get one event
//! - `DELETE /{event_id}`      – delete an event (organizer only)
//! - `POST   /{event_id}/join` – join an event

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod create_event;
mod delete_event;
mod get_event;
mod join_event;
mod list_events;

/// Build the Events API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_events::list_events).post(create_event::create_event),
        )
        .route(
            "/{event_id}",
            get(get_event::get_event).delete(delete_event::delete_event),
        )
        .route("/{event_id}/join", post(join_event::join_event))
}
