use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the services.
///
/// Every variant except [`ServiceError::Infra`] and [`ServiceError::Hash`]
/// is a domain outcome meant to be shown to the caller as is.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or a missing, invalid, or expired token.
    #[error("{0}")]
    Authentication(String),

    /// The acting user may not perform this operation.
    #[error("{0}")]
    Authorization(String),

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The user is already an attendee of the event.
    #[error("already joined this event")]
    AlreadyJoined,

    /// The event has reached its attendee limit.
    #[error("event is full")]
    Capacity,

    /// Persistence failure. Safe for the caller to retry.
    #[error("storage error: {0}")]
    Infra(#[from] StoreError),

    /// Password hashing failed.
    #[error("password hashing error: {0}")]
    Hash(String),
}

impl ServiceError {
    /// Whether this error comes from infrastructure rather than the domain.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Infra(_) | ServiceError::Hash(_))
    }
}
