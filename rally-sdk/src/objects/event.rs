//! Event request and response types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::user::UserSummary;

/// Lifecycle status of an event.
///
/// Only `Cancelled` is ever stored as an override. Every other value is
/// derived from the scheduled date when the event is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

/// Request body for `POST /api/events`.
///
/// Every field except `max_attendees` is required. Missing strings are
/// deserialized as empty so the server can answer with a validation error
/// naming the field instead of a generic JSON rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub max_attendees: Option<i32>,
}

/// An event with its organizer and attendees resolved to user records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: String,
    pub category: String,
    pub organizer: UserSummary,
    pub attendees: Vec<UserSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<i32>,
    pub status: EventStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl EventResponse {
    /// Whether `user_id` is already in the attendee list.
    pub fn has_attendee(&self, user_id: Uuid) -> bool {
        self.attendees.iter().any(|a| a.id == user_id)
    }

    /// Whether the attendee list has reached `max_attendees`.
    pub fn is_full(&self) -> bool {
        self.max_attendees
            .is_some_and(|max| self.attendees.len() >= max.max(0) as usize)
    }
}

/// Payload of the `attendee_joined` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeJoined {
    pub event_id: Uuid,
    pub attendee: UserSummary,
}
