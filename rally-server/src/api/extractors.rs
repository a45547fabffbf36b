//! Custom Axum extractors.
//!
//! Provides:
//! - `CurrentUser` - resolves the `Authorization: Bearer` token to a user.
//! - `ApiJson<T>` / `ApiPath<T>` - `Json` and `Path` whose rejections use the
//!   JSON error body instead of plain text.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use rally_core::entities::user::UserRecord;
use rally_core::services::ServiceError;
use rally_sdk::token;

use super::error::ApiError;
use crate::state::AppState;

/// The user named by a valid bearer token.
///
/// # Header format
///
/// ```text
/// Authorization: Bearer {user_id}.{expires_at}.{base64_signature}
/// ```
///
/// A missing header, a bad or expired token, or a token for a deleted user
/// is rejected with 401.
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ServiceError::Authentication("missing bearer token".into()))?
            .to_str()
            .map_err(|_| ServiceError::Authentication("invalid authorization header".into()))?;

        let bearer = token::parse_bearer(header)
            .ok_or_else(|| ServiceError::Authentication("invalid authorization header".into()))?;

        let user = state.auth.authenticate(bearer).await?;
        Ok(CurrentUser(user))
    }
}

/// `Json<T>` with [`ApiError`] rejections.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path<T>` with [`ApiError`] rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
