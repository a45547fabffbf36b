use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EventsConfig;
use crate::entities::event::{EventRecord, NewEvent};
use crate::entities::user::UserRecord;
use crate::events::{Broadcaster, Notification};
use crate::store::{EventStore, JoinOutcome, StoreError};
use rally_sdk::objects::{AttendeeJoined, CreateEventRequest, EventResponse};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::ServiceError;

/// Validates and applies event operations, then notifies live clients.
///
/// Notifications are published only after the write has succeeded and are
/// best-effort; a publish can never undo or fail a write.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
    broadcaster: Broadcaster,
    config: Arc<RwLock<EventsConfig>>,
}

impl EventService {
    pub fn new(
        store: Arc<dyn EventStore>,
        broadcaster: Broadcaster,
        config: Arc<RwLock<EventsConfig>>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            config,
        }
    }

    /// Every event, earliest first, with users resolved.
    pub async fn list_events(&self) -> Result<Vec<EventResponse>, ServiceError> {
        let records = self.store.list_events().await?;
        self.populate(records).await
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<EventResponse, ServiceError> {
        let record = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(ServiceError::NotFound("event"))?;
        self.populate_one(record).await
    }

    /// Create an event organized by `organizer` and announce it to every
    /// live connection.
    pub async fn create_event(
        &self,
        organizer: &UserRecord,
        draft: CreateEventRequest,
    ) -> Result<EventResponse, ServiceError> {
        let new_event = validate_draft(draft, organizer.id)?;
        let record = self.store.insert_event(new_event).await?;
        let event = self.populate_one(record).await?;

        info!(event_id = %event.id, organizer_id = %organizer.id, "event created");
        self.broadcaster
            .publish(Notification::EventCreated(event.clone()))
            .await;
        Ok(event)
    }

    /// Add `user` to the event's attendees and notify the event's room.
    pub async fn join_event(
        &self,
        user: &UserRecord,
        event_id: Uuid,
    ) -> Result<EventResponse, ServiceError> {
        let record = match self.store.append_attendee(event_id, user.id).await? {
            JoinOutcome::Joined(record) => record,
            JoinOutcome::NotFound => return Err(ServiceError::NotFound("event")),
            JoinOutcome::AlreadyJoined => return Err(ServiceError::AlreadyJoined),
            JoinOutcome::Full => return Err(ServiceError::Capacity),
        };

        info!(%event_id, user_id = %user.id, attendees = record.attendee_ids.len(), "attendee joined");
        self.broadcaster
            .publish(Notification::AttendeeJoined(AttendeeJoined {
                event_id,
                attendee: user.summary(),
            }))
            .await;

        self.populate_one(record).await
    }

    /// Delete an event. Only its organizer may do so.
    pub async fn delete_event(&self, user: &UserRecord, event_id: Uuid) -> Result<(), ServiceError> {
        let record = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(ServiceError::NotFound("event"))?;
        if record.organizer_id != user.id {
            return Err(ServiceError::Authorization(
                "only the organizer can delete this event".into(),
            ));
        }
        if !self.store.delete_event(event_id).await? {
            return Err(ServiceError::NotFound("event"));
        }
        self.broadcaster.close_room(event_id).await;
        info!(%event_id, user_id = %user.id, "event deleted");
        Ok(())
    }

    async fn populate_one(&self, record: EventRecord) -> Result<EventResponse, ServiceError> {
        let mut events = self.populate(vec![record]).await?;
        events.pop().ok_or(ServiceError::NotFound("event"))
    }

    /// Resolve organizer and attendee ids with a single user lookup.
    async fn populate(&self, records: Vec<EventRecord>) -> Result<Vec<EventResponse>, ServiceError> {
        let mut ids: Vec<Uuid> = records
            .iter()
            .flat_map(|r| std::iter::once(r.organizer_id).chain(r.attendee_ids.iter().copied()))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let users: HashMap<Uuid, UserRecord> = self
            .store
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let window = self.config.read().await.ongoing_window;
        let now = OffsetDateTime::now_utc();

        records
            .into_iter()
            .map(|record| -> Result<EventResponse, ServiceError> {
                let organizer = users
                    .get(&record.organizer_id)
                    .ok_or(StoreError::MissingUser(record.organizer_id))?
                    .summary();
                let attendees = record
                    .attendee_ids
                    .iter()
                    .filter_map(|id| {
                        let found = users.get(id).map(UserRecord::summary);
                        if found.is_none() {
                            warn!(event_id = %record.id, user_id = %id, "attendee record missing");
                        }
                        found
                    })
                    .collect();
                Ok(EventResponse {
                    id: record.id,
                    status: record.status_at(now, window),
                    title: record.title,
                    description: record.description,
                    date: record.date,
                    location: record.location,
                    category: record.category,
                    organizer,
                    attendees,
                    max_attendees: record.max_attendees,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                })
            })
            .collect()
    }
}

/// Check a draft and turn it into an insertable event.
///
/// Title, description, date, location, and category are required; strings
/// are trimmed and blank counts as missing. `max_attendees`, when given,
/// must be at least 1.
pub fn validate_draft(draft: CreateEventRequest, organizer_id: Uuid) -> Result<NewEvent, ServiceError> {
    let title = draft.title.trim().to_owned();
    let description = draft.description.trim().to_owned();
    let location = draft.location.trim().to_owned();
    let category = draft.category.trim().to_owned();

    let missing: Vec<&str> = [
        ("title", title.is_empty()),
        ("description", description.is_empty()),
        ("date", draft.date.is_none()),
        ("location", location.is_empty()),
        ("category", category.is_empty()),
    ]
    .into_iter()
    .filter_map(|(field, is_missing)| is_missing.then_some(field))
    .collect();

    let Some(date) = draft.date.filter(|_| missing.is_empty()) else {
        return Err(ServiceError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    };

    if let Some(max) = draft.max_attendees {
        if max < 1 {
            return Err(ServiceError::Validation(
                "maxAttendees must be at least 1".into(),
            ));
        }
    }

    Ok(NewEvent {
        title,
        description,
        date,
        location,
        category,
        organizer_id,
        max_attendees: draft.max_attendees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::NewUser;
    use crate::store::MemoryEventStore;
    use rally_sdk::objects::EventStatus;
    use time::Duration;

    struct Fixture {
        store: MemoryEventStore,
        broadcaster: Broadcaster,
        service: EventService,
    }

    fn fixture() -> Fixture {
        let store = MemoryEventStore::new();
        let broadcaster = Broadcaster::new();
        let service = EventService::new(
            Arc::new(store.clone()),
            broadcaster.clone(),
            Arc::new(RwLock::new(EventsConfig::default())),
        );
        Fixture {
            store,
            broadcaster,
            service,
        }
    }

    async fn user(store: &MemoryEventStore, name: &str) -> UserRecord {
        store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{name}@example.com"),
                password_hash: None,
                is_guest: false,
            })
            .await
            .unwrap()
    }

    fn draft(title: &str, max_attendees: Option<i32>) -> CreateEventRequest {
        CreateEventRequest {
            title: title.into(),
            description: "An evening of talks".into(),
            date: Some(OffsetDateTime::now_utc() + Duration::days(7)),
            location: "Main hall".into(),
            category: "meetup".into(),
            max_attendees,
        }
    }

    #[tokio::test]
    async fn test_create_event_sets_organizer_and_broadcasts() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let (_conn, mut rx) = f.broadcaster.register().await;

        let event = f
            .service
            .create_event(&organizer, draft("  Rust night ", None))
            .await
            .unwrap();

        assert_eq!(event.title, "Rust night");
        assert_eq!(event.organizer, organizer.summary());
        assert!(event.attendees.is_empty());
        assert_eq!(event.status, EventStatus::Upcoming);

        let notification = rx.try_recv().unwrap();
        assert_eq!(*notification, Notification::EventCreated(event));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_event_missing_title_persists_nothing() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let (_conn, mut rx) = f.broadcaster.register().await;

        let err = f
            .service
            .create_event(&organizer, draft("   ", None))
            .await
            .unwrap_err();

        match err {
            ServiceError::Validation(msg) => assert!(msg.contains("title")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(f.service.list_events().await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_validate_draft_reports_every_missing_field() {
        let err = validate_draft(
            CreateEventRequest {
                title: String::new(),
                description: "d".into(),
                date: None,
                location: String::new(),
                category: "c".into(),
                max_attendees: None,
            },
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required fields: title, date, location"
        );
    }

    #[test]
    fn test_validate_draft_rejects_zero_capacity() {
        let err = validate_draft(draft("t", Some(0)), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_join_event_notifies_room() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let alice = user(&f.store, "alice").await;
        let event = f
            .service
            .create_event(&organizer, draft("Board games", None))
            .await
            .unwrap();

        let (subscriber, mut rx) = f.broadcaster.register().await;
        let (_bystander, mut other_rx) = f.broadcaster.register().await;
        f.broadcaster.subscribe(subscriber, event.id).await;

        let joined = f.service.join_event(&alice, event.id).await.unwrap();
        assert_eq!(joined.attendees, vec![alice.summary()]);
        assert_eq!(joined.organizer, organizer.summary());

        assert_eq!(
            *rx.recv().await.unwrap(),
            Notification::AttendeeJoined(AttendeeJoined {
                event_id: event.id,
                attendee: alice.summary(),
            })
        );
        assert!(rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_twice_is_rejected_without_duplicate() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let alice = user(&f.store, "alice").await;
        let event = f
            .service
            .create_event(&organizer, draft("Chess", None))
            .await
            .unwrap();

        f.service.join_event(&alice, event.id).await.unwrap();
        let err = f.service.join_event(&alice, event.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyJoined));

        let stored = f.service.get_event(event.id).await.unwrap();
        assert_eq!(stored.attendees.len(), 1);
    }

    #[tokio::test]
    async fn test_join_unknown_event() {
        let f = fixture();
        let alice = user(&f.store, "alice").await;
        let err = f
            .service
            .join_event(&alice, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("event")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_join_for_last_slot() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let alice = user(&f.store, "alice").await;
        let bob = user(&f.store, "bob").await;
        let event = f
            .service
            .create_event(&organizer, draft("Tiny dinner", Some(1)))
            .await
            .unwrap();

        let event_id = event.id;
        let (a, b) = tokio::join!(
            tokio::spawn({
                let service = f.service.clone();
                async move { service.join_event(&alice, event_id).await }
            }),
            tokio::spawn({
                let service = f.service.clone();
                async move { service.join_event(&bob, event_id).await }
            }),
        );
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(ServiceError::Capacity)))
                .count(),
            1
        );
        assert_eq!(f.service.get_event(event.id).await.unwrap().attendees.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capacity_never_exceeded() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let event = f
            .service
            .create_event(&organizer, draft("Workshop", Some(3)))
            .await
            .unwrap();

        let event_id = event.id;
        let mut handles = Vec::new();
        for i in 0..12 {
            let attendee = user(&f.store, &format!("user{i}")).await;
            let service = f.service.clone();
            handles.push(tokio::spawn(async move {
                service.join_event(&attendee, event_id).await
            }));
        }

        let mut joined = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => joined += 1,
                Err(ServiceError::Capacity) => full += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(joined, 3);
        assert_eq!(full, 9);

        let stored = f.service.get_event(event.id).await.unwrap();
        assert_eq!(stored.attendees.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_requires_organizer() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let mallory = user(&f.store, "mallory").await;
        let event = f
            .service
            .create_event(&organizer, draft("Picnic", None))
            .await
            .unwrap();

        let err = f.service.delete_event(&mallory, event.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
        assert!(f.service.get_event(event.id).await.is_ok());

        f.service.delete_event(&organizer, event.id).await.unwrap();
        assert!(matches!(
            f.service.get_event(event.id).await,
            Err(ServiceError::NotFound("event"))
        ));
        assert!(matches!(
            f.service.delete_event(&organizer, event.id).await,
            Err(ServiceError::NotFound("event"))
        ));
    }

    #[tokio::test]
    async fn test_list_events_sorted_by_date() {
        let f = fixture();
        let organizer = user(&f.store, "org").await;
        let mut later = draft("later", None);
        later.date = Some(OffsetDateTime::now_utc() + Duration::days(30));
        let mut sooner = draft("sooner", None);
        sooner.date = Some(OffsetDateTime::now_utc() + Duration::days(1));

        f.service.create_event(&organizer, later).await.unwrap();
        f.service.create_event(&organizer, sooner).await.unwrap();

        let titles: Vec<String> = f
            .service
            .list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["sooner", "later"]);
    }
}
