use axum::{Json, extract::State};
use rally_sdk::objects::EventResponse;

use crate::api::error::ApiError;
use crate::state::AppState;

/// `GET /events` - every event with organizer and attendees resolved.
pub(super) async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    Ok(Json(state.events.list_events().await?))
}
