//! Application services.
//!
//! - [`EventService`]: create, list, join, and delete events, publishing a
//!   notification after each successful create or join.
//! - [`AuthService`]: registration, password and guest login, and bearer
//!   token authentication.

mod auth;
mod error;
mod events;

pub use auth::{AuthService, Session};
pub use error::ServiceError;
pub use events::EventService;
