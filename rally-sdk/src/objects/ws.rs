//! WebSocket message types for the live event feed.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection. Both
//! directions exchange internally-tagged JSON objects so each side can
//! dispatch on the `"type"` field.
//!
//! # Protocol
//!
//! 1. Every connection receives [`WsServerMessage::EventCreated`] for each
//!    event created while it is open.
//! 2. A client sends [`WsClientMessage::JoinEventRoom`] to start receiving
//!    [`WsServerMessage::AttendeeJoined`] for one event, and
//!    [`WsClientMessage::LeaveEventRoom`] to stop.
//! 3. A malformed client frame is answered with [`WsServerMessage::Error`];
//!    the connection stays open.
//! 4. Closing the socket drops every room membership of the connection.
//!
//! # Field casing
//!
//! Frame envelopes use snake_case (`type`, `event_id`, `code`, `reason`).
//! Objects embedded in a frame ([`EventResponse`], [`UserSummary`]) keep
//! the camelCase of the REST API, so a client parses them with the same
//! types in both places.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventResponse;
use super::user::UserSummary;

/// Client-to-server WebSocket message.
///
/// ```json
/// {"type":"join_event_room","event_id":"0190..."}
/// {"type":"leave_event_room","event_id":"0190..."}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    JoinEventRoom { event_id: Uuid },
    LeaveEventRoom { event_id: Uuid },
}

/// Server-to-client WebSocket message.
///
/// ```json
/// {"type":"event_created","event":{ ... }}
/// {"type":"attendee_joined","event_id":"0190...","attendee":{ ... }}
/// {"type":"error","code":4000,"reason":"malformed message"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// A new event was created. Sent to every open connection.
    EventCreated { event: EventResponse },

    /// A user joined an event. Sent only to connections in that event's room.
    AttendeeJoined { event_id: Uuid, attendee: UserSummary },

    /// A server-side error that does **not** close the connection by itself.
    Error {
        /// Application-level error code (see [`WsCloseCode`]).
        code: u16,
        /// Human-readable reason.
        reason: String,
    },
}

/// Well-known WebSocket close and error codes.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// The client sent a frame that is not a valid [`WsClientMessage`].
    pub const MALFORMED_MESSAGE: u16 = 4000;
}
