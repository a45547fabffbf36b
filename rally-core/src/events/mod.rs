//! Real-time notification fan-out.
//!
//! The [`Broadcaster`] is a registry of live connections and of the event
//! rooms each one has joined. Services publish a [`Notification`] after a
//! successful write; the broadcaster enqueues it on every matching
//! connection's outbound queue and never reports delivery failures to the
//! publisher.
//!
//! # Flow
//!
//! 1. A WebSocket connection calls [`Broadcaster::register`] and drains the
//!    returned receiver.
//! 2. `join_event_room` / `leave_event_room` frames map to
//!    [`Broadcaster::subscribe`] / [`Broadcaster::unsubscribe`].
//! 3. `EventService` publishes `EventCreated` and `AttendeeJoined`.
//! 4. On socket close the connection calls [`Broadcaster::disconnect`],
//!    which removes it from every room.

mod broadcaster;
pub mod types;

pub use broadcaster::{
    Broadcaster, ConnectionId, DEFAULT_QUEUE_CAPACITY, NotificationReceiver, NotificationSender,
};
pub use types::{Audience, Notification};
