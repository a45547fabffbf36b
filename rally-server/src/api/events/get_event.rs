use axum::{Json, extract::State};
use rally_sdk::objects::EventResponse;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::ApiPath;
use crate::state::AppState;

pub(super) async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    Ok(Json(state.events.get_event(event_id).await?))
}
