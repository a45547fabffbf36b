//! Notification types pushed to live connections.

use rally_sdk::objects::{AttendeeJoined, EventResponse, WsServerMessage};
use uuid::Uuid;

/// A state change fanned out by the [`Broadcaster`](super::Broadcaster).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A new event exists. Delivered to every connection, since nobody
    /// can be subscribed to an event they have not seen yet.
    EventCreated(EventResponse),
    /// A user joined an event. Delivered to that event's subscribers only.
    AttendeeJoined(AttendeeJoined),
}

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Room(Uuid),
}

impl Notification {
    pub fn audience(&self) -> Audience {
        match self {
            Notification::EventCreated(_) => Audience::Everyone,
            Notification::AttendeeJoined(joined) => Audience::Room(joined.event_id),
        }
    }

    /// The wire message sent to clients.
    pub fn to_message(&self) -> WsServerMessage {
        match self {
            Notification::EventCreated(event) => WsServerMessage::EventCreated {
                event: event.clone(),
            },
            Notification::AttendeeJoined(joined) => WsServerMessage::AttendeeJoined {
                event_id: joined.event_id,
                attendee: joined.attendee.clone(),
            },
        }
    }
}
