pub mod event;
pub mod user;

/// Columns selected whenever a full user row is read.
pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, is_guest, created_at";

/// Columns selected whenever a full event row is read.
pub(crate) const EVENT_COLUMNS: &str = "id, title, description, date, location, category, \
    organizer_id, attendee_ids, max_attendees, status, created_at, updated_at";

/// Whether a database error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}
