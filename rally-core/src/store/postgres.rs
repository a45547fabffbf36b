use crate::entities::event::{
    AppendAttendee, DeleteEvent, EventRecord, GetEventById, InsertEvent, ListEvents, NewEvent,
};
use crate::entities::is_unique_violation;
use crate::entities::user::{
    GetUserByEmail, GetUserById, GetUsersByIds, InsertUser, NewUser, UserRecord,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

use super::{EventStore, JoinOutcome, StoreError};

/// [`EventStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgEventStore {
    processor: DatabaseProcessor,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        self.processor
            .process(InsertUser { user })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::EmailTaken
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.processor.process(GetUserById { id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetUserByEmail {
                email: email.to_owned(),
            })
            .await?)
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetUsersByIds { ids: ids.to_vec() })
            .await?)
    }

    async fn insert_event(&self, event: NewEvent) -> Result<EventRecord, StoreError> {
        Ok(self.processor.process(InsertEvent { event }).await?)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.processor.process(GetEventById { id }).await?)
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.processor.process(ListEvents).await?)
    }

    async fn append_attendee(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<JoinOutcome, StoreError> {
        if let Some(updated) = self
            .processor
            .process(AppendAttendee { event_id, user_id })
            .await?
        {
            return Ok(JoinOutcome::Joined(updated));
        }

        // Nothing was updated. Attendees only grow, so whichever condition
        // blocked the update still holds on a fresh read.
        let current = self.processor.process(GetEventById { id: event_id }).await?;
        Ok(match current {
            None => JoinOutcome::NotFound,
            Some(event) if event.has_attendee(user_id) => JoinOutcome::AlreadyJoined,
            Some(_) => JoinOutcome::Full,
        })
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.processor.process(DeleteEvent { id }).await?)
    }
}
