//! Client-side view of the event list.
//!
//! [`EventView`] holds the ordered list of events a client displays and
//! merges two kinds of change into it:
//!
//! * a full refresh (`GET /api/events`), which replaces the list wholesale;
//! * streamed deltas ([`WsServerMessage::EventCreated`] and
//!   [`WsServerMessage::AttendeeJoined`]), which are merged in place.
//!
//! Every merge is idempotent and keyed by id, so a delta delivered twice, or
//! a delta racing the client's own optimistic join, never duplicates an
//! entry.
//!
//! The view does no I/O. Operations that change which events are visible
//! return the [`RoomChanges`] the caller must send on the live feed so the
//! server's subscriber sets follow the view.

use std::collections::HashSet;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::objects::{EventResponse, UserSummary, WsClientMessage, WsServerMessage};

/// Room subscriptions to add and remove after a view change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomChanges {
    pub join: Vec<Uuid>,
    pub leave: Vec<Uuid>,
}

impl RoomChanges {
    pub fn is_empty(&self) -> bool {
        self.join.is_empty() && self.leave.is_empty()
    }

    /// The live-feed messages that apply these changes. Leaves come first.
    pub fn into_messages(self) -> Vec<WsClientMessage> {
        self.leave
            .into_iter()
            .map(|event_id| WsClientMessage::LeaveEventRoom { event_id })
            .chain(
                self.join
                    .into_iter()
                    .map(|event_id| WsClientMessage::JoinEventRoom { event_id }),
            )
            .collect()
    }
}

/// What a streamed delta did to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A new event was appended. The caller should join its room.
    EventAdded(RoomChanges),
    /// An attendee was appended to an existing event.
    AttendeeAdded,
    /// The delta was already reflected in the view, or refers to an event
    /// the view does not hold.
    Unchanged,
    /// The message carries no view state (e.g. a server error frame).
    Ignored,
}

/// Date-based filter used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Scheduled strictly after `now`.
    Upcoming,
    /// Scheduled at or before `now`.
    Past,
    All,
}

/// Summary counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub upcoming: usize,
    pub joined: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EventView {
    events: Vec<EventResponse>,
}

impl EventView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EventResponse] {
        &self.events
    }

    pub fn get(&self, event_id: Uuid) -> Option<&EventResponse> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn ids(&self) -> HashSet<Uuid> {
        self.events.iter().map(|e| e.id).collect()
    }

    /// Replace the view with a full listing.
    ///
    /// Duplicate ids in `events` keep their first occurrence. Returns the
    /// rooms to join (newly visible) and leave (no longer visible).
    pub fn replace_all(&mut self, events: Vec<EventResponse>) -> RoomChanges {
        let before = self.ids();

        let mut seen = HashSet::with_capacity(events.len());
        self.events = events.into_iter().filter(|e| seen.insert(e.id)).collect();

        let join = self
            .events
            .iter()
            .map(|e| e.id)
            .filter(|id| !before.contains(id))
            .collect();
        let mut leave: Vec<Uuid> = before.difference(&seen).copied().collect();
        leave.sort_unstable();

        RoomChanges { join, leave }
    }

    /// Merge a server-pushed message into the view.
    pub fn apply(&mut self, message: &WsServerMessage) -> Applied {
        match message {
            WsServerMessage::EventCreated { event } => self.add_event(event.clone()),
            WsServerMessage::AttendeeJoined { event_id, attendee } => {
                if self.add_attendee(*event_id, attendee.clone()) {
                    Applied::AttendeeAdded
                } else {
                    Applied::Unchanged
                }
            }
            WsServerMessage::Error { .. } => Applied::Ignored,
        }
    }

    /// Append an event unless one with the same id is already present.
    pub fn add_event(&mut self, event: EventResponse) -> Applied {
        if self.get(event.id).is_some() {
            return Applied::Unchanged;
        }
        let id = event.id;
        self.events.push(event);
        Applied::EventAdded(RoomChanges {
            join: vec![id],
            leave: Vec::new(),
        })
    }

    /// Append `attendee` to the event unless already listed.
    ///
    /// Returns `true` if the view changed.
    pub fn add_attendee(&mut self, event_id: Uuid, attendee: UserSummary) -> bool {
        let Some(event) = self.events.iter_mut().find(|e| e.id == event_id) else {
            return false;
        };
        if event.has_attendee(attendee.id) {
            return false;
        }
        event.attendees.push(attendee);
        true
    }

    /// Record the local user's join before the server confirms it.
    pub fn join_optimistically(&mut self, event_id: Uuid, me: UserSummary) -> bool {
        self.add_attendee(event_id, me)
    }

    /// Merge the authoritative event returned by `POST /api/events/{id}/join`.
    ///
    /// The server's copy replaces the local one, but attendees known locally
    /// and missing from the response are kept: a delta for a later join can
    /// arrive before this response, and attendee lists only ever grow.
    /// An event not in the view is appended.
    pub fn apply_join_response(&mut self, mut authoritative: EventResponse) -> Applied {
        let Some(index) = self.events.iter().position(|e| e.id == authoritative.id) else {
            return self.add_event(authoritative);
        };
        let slot = &mut self.events[index];
        for attendee in &slot.attendees {
            if !authoritative.has_attendee(attendee.id) {
                authoritative.attendees.push(attendee.clone());
            }
        }
        if *slot == authoritative {
            return Applied::Unchanged;
        }
        *slot = authoritative;
        Applied::AttendeeAdded
    }

    /// Drop an event from the view, returning the room to leave.
    pub fn remove_event(&mut self, event_id: Uuid) -> RoomChanges {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        if self.events.len() == before {
            return RoomChanges::default();
        }
        RoomChanges {
            join: Vec::new(),
            leave: vec![event_id],
        }
    }

    /// Tear the view down, returning every room to leave.
    pub fn teardown(&mut self) -> RoomChanges {
        let leave = self.events.drain(..).map(|e| e.id).collect();
        RoomChanges {
            join: Vec::new(),
            leave,
        }
    }

    pub fn filter(&self, filter: DateFilter, now: OffsetDateTime) -> Vec<&EventResponse> {
        self.events
            .iter()
            .filter(|e| match filter {
                DateFilter::Upcoming => e.date > now,
                DateFilter::Past => e.date <= now,
                DateFilter::All => true,
            })
            .collect()
    }

    pub fn stats(&self, user_id: Option<Uuid>, now: OffsetDateTime) -> DashboardStats {
        DashboardStats {
            total: self.events.len(),
            upcoming: self.events.iter().filter(|e| e.date > now).count(),
            joined: user_id.map_or(0, |id| {
                self.events.iter().filter(|e| e.has_attendee(id)).count()
            }),
        }
    }
}
