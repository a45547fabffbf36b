//! The persistence collaborator.
//!
//! [`EventStore`] is the seam between the services and storage. Two
//! implementations exist:
//!
//! - [`PgEventStore`]: PostgreSQL via the SQL processors in
//!   [`crate::entities`].
//! - [`MemoryEventStore`]: process-local maps, for development and tests.
//!
//! Both must make [`EventStore::append_attendee`] atomic: the membership
//! check, the capacity check, and the append are one unit with respect to
//! other appends on the same event.

mod memory;
mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use crate::entities::event::{EventRecord, NewEvent};
use crate::entities::user::{NewUser, UserRecord};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another user already has this email.
    #[error("email already registered")]
    EmailTaken,

    /// A record references a user that does not exist.
    #[error("dangling user reference: {0}")]
    MissingUser(Uuid),
}

/// Result of [`EventStore::append_attendee`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user was appended; carries the updated record.
    Joined(EventRecord),
    NotFound,
    AlreadyJoined,
    Full,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a user. Fails with [`StoreError::EmailTaken`] on a duplicate email.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Fetch users by id. Unknown ids are skipped; order is unspecified.
    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, StoreError>;

    async fn insert_event(&self, event: NewEvent) -> Result<EventRecord, StoreError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<EventRecord>, StoreError>;

    /// Every event, sorted by date ascending then creation time.
    async fn list_events(&self) -> Result<Vec<EventRecord>, StoreError>;

    /// Atomically append `user_id` to the event's attendees if absent and
    /// not full.
    async fn append_attendee(&self, event_id: Uuid, user_id: Uuid)
    -> Result<JoinOutcome, StoreError>;

    /// Delete an event. Returns whether it existed.
    async fn delete_event(&self, id: Uuid) -> Result<bool, StoreError>;
}
