use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::event::{EventRecord, NewEvent, StoredEventStatus};
use crate::entities::user::{NewUser, UserRecord};
use async_trait::async_trait;
use itertools::Itertools;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventStore, JoinOutcome, StoreError};

/// [`EventStore`] kept in process memory.
///
/// Every mutation takes the single write guard, which makes the
/// check-and-append of [`EventStore::append_attendee`] atomic.
#[derive(Clone, Default)]
pub struct MemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRecord>,
    events: HashMap<Uuid, EventRecord>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }
        let record = UserRecord {
            id: Uuid::now_v7(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            is_guest: user.is_guest,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .unique()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<EventRecord, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&event.organizer_id) {
            return Err(StoreError::MissingUser(event.organizer_id));
        }
        let now = OffsetDateTime::now_utc();
        let record = EventRecord {
            id: Uuid::now_v7(),
            title: event.title,
            description: event.description,
            date: event.date,
            location: event.location,
            category: event.category,
            organizer_id: event.organizer_id,
            attendee_ids: Vec::new(),
            max_attendees: event.max_attendees,
            status: StoredEventStatus::Upcoming,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .sorted_by_key(|e| (e.date, e.created_at, e.id))
            .cloned()
            .collect())
    }

    async fn append_attendee(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<JoinOutcome, StoreError> {
        let mut state = self.state.write().await;
        let Some(event) = state.events.get_mut(&event_id) else {
            return Ok(JoinOutcome::NotFound);
        };
        if event.has_attendee(user_id) {
            return Ok(JoinOutcome::AlreadyJoined);
        }
        if event.is_full() {
            return Ok(JoinOutcome::Full);
        }
        event.attendee_ids.push(user_id);
        event.updated_at = OffsetDateTime::now_utc();
        Ok(JoinOutcome::Joined(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().await.events.remove(&id).is_some())
    }
}
