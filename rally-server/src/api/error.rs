//! Mapping of service errors to HTTP responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rally_core::services::ServiceError;
use rally_sdk::objects::{ApiErrorBody, ApiErrorKind};

/// Error returned by every REST handler.
///
/// Rendered as `{"error": "<kind>", "message": "<text>"}`. Infrastructure
/// failures are logged and collapsed into an opaque 500.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ServiceError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, ApiErrorKind) {
        match &self.0 {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, ApiErrorKind::ValidationError),
            ServiceError::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, ApiErrorKind::AuthenticationError)
            }
            ServiceError::Authorization(_) => {
                (StatusCode::FORBIDDEN, ApiErrorKind::AuthorizationError)
            }
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, ApiErrorKind::NotFound),
            ServiceError::AlreadyJoined => (StatusCode::BAD_REQUEST, ApiErrorKind::AlreadyJoined),
            ServiceError::Capacity => (StatusCode::BAD_REQUEST, ApiErrorKind::CapacityExceeded),
            ServiceError::Infra(_) | ServiceError::Hash(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ApiErrorKind::InternalError)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = if self.0.is_internal() {
            tracing::error!(error = %self.0, "API internal error");
            "internal server error".to_owned()
        } else {
            self.0.to_string()
        };
        (status, Json(ApiErrorBody::new(kind, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_core::store::StoreError;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(ServiceError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ServiceError::Authentication("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(ServiceError::Authorization("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::NotFound("event")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ServiceError::AlreadyJoined), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::Capacity), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ServiceError::Infra(StoreError::EmailTaken)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
