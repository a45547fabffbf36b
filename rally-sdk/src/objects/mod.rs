pub mod error;
pub mod event;
pub mod user;
pub mod ws;

pub use error::{ApiErrorBody, ApiErrorKind};
pub use event::{AttendeeJoined, CreateEventRequest, EventResponse, EventStatus};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, UserSummary};
pub use ws::{WsClientMessage, WsCloseCode, WsServerMessage};
