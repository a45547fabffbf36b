//! Event status configuration.

use time::Duration;

/// Default time an event counts as ongoing after it starts.
pub const DEFAULT_ONGOING_WINDOW: Duration = Duration::minutes(120);

#[derive(Debug, Clone, Copy)]
pub struct EventsConfig {
    /// How long after its scheduled date an event is reported as ongoing.
    pub ongoing_window: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ongoing_window: DEFAULT_ONGOING_WINDOW,
        }
    }
}
