use crate::entities::EVENT_COLUMNS;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rally_sdk::objects::EventStatus;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: OffsetDateTime,
    pub location: String,
    pub category: String,
    pub organizer_id: Uuid,
    /// Ordered by join time. Never contains the same id twice.
    pub attendee_ids: Vec<Uuid>,
    pub max_attendees: Option<i32>,
    pub status: StoredEventStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl EventRecord {
    pub fn has_attendee(&self, user_id: Uuid) -> bool {
        self.attendee_ids.contains(&user_id)
    }

    pub fn is_full(&self) -> bool {
        self.max_attendees
            .is_some_and(|max| self.attendee_ids.len() >= max.max(0) as usize)
    }

    /// The status a reader should see at `now`.
    pub fn status_at(&self, now: OffsetDateTime, ongoing_window: Duration) -> EventStatus {
        derive_status(self.status, self.date, now, ongoing_window)
    }
}

/// Status as stored in the `event_status` column.
///
/// New events are stored as `Upcoming`. Only `Cancelled` overrides the
/// date-derived status; see [`derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "event_status")]
pub enum StoredEventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

/// Compute the status of an event scheduled at `date`, as seen at `now`.
///
/// An event is `Ongoing` from its scheduled time until `ongoing_window`
/// has elapsed, then `Completed`.
pub fn derive_status(
    stored: StoredEventStatus,
    date: OffsetDateTime,
    now: OffsetDateTime,
    ongoing_window: Duration,
) -> EventStatus {
    if stored == StoredEventStatus::Cancelled {
        return EventStatus::Cancelled;
    }
    if now < date {
        return EventStatus::Upcoming;
    }
    // A window end past the representable range never arrives.
    match date.checked_add(ongoing_window) {
        Some(end) if now >= end => EventStatus::Completed,
        _ => EventStatus::Ongoing,
    }
}

/// Data for inserting a new event. Attendees always start empty.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: OffsetDateTime,
    pub location: String,
    pub category: String,
    pub organizer_id: Uuid,
    pub max_attendees: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct InsertEvent {
    pub event: NewEvent,
}

impl Processor<InsertEvent> for DatabaseProcessor {
    type Output = EventRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertEvent")]
    async fn process(&self, insert: InsertEvent) -> Result<EventRecord, sqlx::Error> {
        let e = insert.event;
        let sql = format!(
            "INSERT INTO events \
             (id, title, description, date, location, category, organizer_id, max_attendees) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, EventRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(e.title)
            .bind(e.description)
            .bind(e.date)
            .bind(e.location)
            .bind(e.category)
            .bind(e.organizer_id)
            .bind(e.max_attendees)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetEventById {
    pub id: Uuid,
}

impl Processor<GetEventById> for DatabaseProcessor {
    type Output = Option<EventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetEventById")]
    async fn process(&self, query: GetEventById) -> Result<Option<EventRecord>, sqlx::Error> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRecord>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// List every event, earliest scheduled first.
pub struct ListEvents;

impl Processor<ListEvents> for DatabaseProcessor {
    type Output = Vec<EventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEvents")]
    async fn process(&self, _query: ListEvents) -> Result<Vec<EventRecord>, sqlx::Error> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC, created_at ASC");
        sqlx::query_as::<_, EventRecord>(&sql)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Append an attendee if they are not already listed and a slot is free.
///
/// The membership and capacity checks are part of the `UPDATE` predicate, so
/// concurrent appends to the same row are serialized by the row lock and
/// each one re-checks against the committed attendee list. Returns `None`
/// when no row was updated; the caller re-reads to find out why.
pub struct AppendAttendee {
    pub event_id: Uuid,
    pub user_id: Uuid,
}

impl Processor<AppendAttendee> for DatabaseProcessor {
    type Output = Option<EventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:AppendAttendee")]
    async fn process(&self, update: AppendAttendee) -> Result<Option<EventRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE events \
             SET attendee_ids = array_append(attendee_ids, $2), updated_at = now() \
             WHERE id = $1 \
               AND NOT ($2 = ANY(attendee_ids)) \
               AND (max_attendees IS NULL OR cardinality(attendee_ids) < max_attendees) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, EventRecord>(&sql)
            .bind(update.event_id)
            .bind(update.user_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Delete an event. Returns whether a row was removed.
pub struct DeleteEvent {
    pub id: Uuid,
}

impl Processor<DeleteEvent> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteEvent")]
    async fn process(&self, delete: DeleteEvent) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(delete.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
