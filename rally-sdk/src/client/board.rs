//! A live event list: REST listing, live feed, and [`EventView`] wired
//! together.

use uuid::Uuid;

use super::{ApiClient, ClientError, LiveFeed};
use crate::objects::UserSummary;
use crate::reconciler::{Applied, EventView};

/// Keeps an [`EventView`] in sync with the server.
///
/// Rooms are joined for every event as soon as it becomes visible and left
/// when it disappears or the board is closed, so the server never holds a
/// subscription the view no longer needs.
pub struct LiveEventBoard {
    api: ApiClient,
    feed: LiveFeed,
    view: EventView,
}

impl LiveEventBoard {
    /// Connect the live feed, then load the initial listing.
    ///
    /// The feed is opened first so that an event created between the two
    /// steps is not missed; the view's merge is idempotent either way.
    pub async fn open(api: ApiClient) -> Result<Self, ClientError> {
        let feed = LiveFeed::connect(api.base_url()).await?;
        let mut board = Self {
            api,
            feed,
            view: EventView::new(),
        };
        board.refresh().await?;
        Ok(board)
    }

    pub fn view(&self) -> &EventView {
        &self.view
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    /// Replace the view with a fresh listing and resync rooms.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let events = self.api.list_events().await?;
        let changes = self.view.replace_all(events);
        self.feed.apply_room_changes(changes).await
    }

    /// Wait for the next pushed delta and merge it.
    ///
    /// Returns `None` once the server closes the feed.
    pub async fn next_update(&mut self) -> Option<Result<Applied, ClientError>> {
        let message = match self.feed.next_message().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(e)),
        };
        let applied = self.view.apply(&message);
        if let Applied::EventAdded(changes) = &applied {
            if let Err(e) = self.feed.apply_room_changes(changes.clone()).await {
                return Some(Err(e));
            }
        }
        Some(Ok(applied))
    }

    /// Join an event as `me`.
    ///
    /// The view shows the join immediately and is reconciled with the
    /// server's answer. On any error the server state is unchanged, so the
    /// listing is re-fetched to drop the optimistic entry.
    pub async fn join(&mut self, event_id: Uuid, me: UserSummary) -> Result<(), ClientError> {
        self.view.join_optimistically(event_id, me);
        match self.api.join_event(event_id).await {
            Ok(event) => {
                if let Applied::EventAdded(changes) = self.view.apply_join_response(event) {
                    self.feed.apply_room_changes(changes).await?;
                }
                Ok(())
            }
            Err(e) => {
                // Report the join error, not a refresh failure.
                let _ = self.refresh().await;
                Err(e)
            }
        }
    }

    /// Leave every room and close the feed.
    pub async fn close(mut self) -> Result<(), ClientError> {
        let changes = self.view.teardown();
        self.feed.apply_room_changes(changes).await?;
        self.feed.close().await
    }
}
