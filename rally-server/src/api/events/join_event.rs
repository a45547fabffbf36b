use axum::{Json, extract::State};
use rally_sdk::objects::EventResponse;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::{ApiPath, CurrentUser};
use crate::state::AppState;

/// `POST /events/{event_id}/join` - add the caller to the attendees.
///
/// Returns the updated event. Connections in the event's room receive an
/// `attendee_joined` message. Joining twice or joining a full event is a
/// 400 with `already_joined` or `capacity_exceeded`.
pub(super) async fn join_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    Ok(Json(state.events.join_event(&user, event_id).await?))
}
