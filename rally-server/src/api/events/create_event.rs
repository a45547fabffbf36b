use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rally_sdk::objects::CreateEventRequest;

use crate::api::error::ApiError;
use crate::api::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

/// `POST /events` - create an event organized by the caller.
///
/// Answers 201 with the populated event. Every live connection receives
/// an `event_created` message.
pub(super) async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.create_event(&user, body).await?;
    Ok((StatusCode::CREATED, Json(event)))
}
