use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::{ApiPath, CurrentUser};
use crate::state::AppState;

/// `DELETE /events/{event_id}` - 204, or 403 unless the caller organizes it.
pub(super) async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.events.delete_event(&user, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
