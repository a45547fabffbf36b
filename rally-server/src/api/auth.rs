//! Auth API handlers.
//!
//! # Endpoints
//!
//! - `POST /register` – create an account and a session
//! - `POST /login`    – start a session with email and password
//! - `POST /guest`    – start a session as a new guest
//! - `GET  /me`       – the user behind the bearer token

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rally_sdk::objects::{AuthResponse, LoginRequest, RegisterRequest};

use super::error::ApiError;
use super::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

/// Build the Auth API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/guest", post(guest))
        .route("/me", get(me))
}

/// `POST /register` - 201 with a session, 400 if the email is taken.
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.register(body).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// `POST /login` - 401 on any credential mismatch.
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state.auth.login(body).await?;
    Ok(Json(session.into()))
}

/// `POST /guest` - always creates a fresh guest identity.
async fn guest(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.guest().await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user.summary())
}
