use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{Audience, Notification};

/// Outbound queue length per connection.
///
/// A connection that falls this far behind starts losing notifications
/// instead of stalling publishers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sender half of a connection's outbound queue.
pub type NotificationSender = mpsc::Sender<Arc<Notification>>;
/// Receiver half of a connection's outbound queue.
pub type NotificationReceiver = mpsc::Receiver<Arc<Notification>>;

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Registry of live connections and their event rooms.
///
/// Cloning is cheap; all clones share one registry.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    next_id: AtomicU64,
    queue_capacity: usize,
    registry: RwLock<Registry>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    /// event id -> subscribed connections. Empty sets are removed.
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
}

struct Connection {
    tx: NotificationSender,
    rooms: HashSet<Uuid>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// Register a new connection.
    ///
    /// Returns its id and the receiver it must drain. The connection gets
    /// every global notification from now on, and no room notifications
    /// until it subscribes.
    pub async fn register(&self) -> (ConnectionId, NotificationReceiver) {
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        self.inner.registry.write().await.connections.insert(
            id,
            Connection {
                tx,
                rooms: HashSet::new(),
            },
        );
        debug!(connection = %id, "connection registered");
        (id, rx)
    }

    /// Add a connection to an event's room. Idempotent.
    ///
    /// Returns `false` if the connection is not registered.
    pub async fn subscribe(&self, connection: ConnectionId, event_id: Uuid) -> bool {
        let mut registry = self.inner.registry.write().await;
        let Some(conn) = registry.connections.get_mut(&connection) else {
            return false;
        };
        conn.rooms.insert(event_id);
        registry
            .rooms
            .entry(event_id)
            .or_default()
            .insert(connection);
        debug!(%connection, %event_id, "joined event room");
        true
    }

    /// Remove a connection from an event's room. Unknown connections and
    /// rooms are ignored.
    pub async fn unsubscribe(&self, connection: ConnectionId, event_id: Uuid) {
        let mut registry = self.inner.registry.write().await;
        if let Some(conn) = registry.connections.get_mut(&connection) {
            conn.rooms.remove(&event_id);
        }
        registry.leave_room(event_id, connection);
        debug!(%connection, %event_id, "left event room");
    }

    /// Forget a connection and every room it was in.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut registry = self.inner.registry.write().await;
        let Some(conn) = registry.connections.remove(&connection) else {
            return;
        };
        for event_id in conn.rooms {
            registry.leave_room(event_id, connection);
        }
        debug!(%connection, "connection removed");
    }

    /// Drop an event's room, e.g. after the event is deleted.
    pub async fn close_room(&self, event_id: Uuid) {
        let mut registry = self.inner.registry.write().await;
        let Some(members) = registry.rooms.remove(&event_id) else {
            return;
        };
        for connection in members {
            if let Some(conn) = registry.connections.get_mut(&connection) {
                conn.rooms.remove(&event_id);
            }
        }
    }

    /// Enqueue a notification on every matching connection.
    ///
    /// Never blocks and never fails: a full or closed queue loses this
    /// delivery and is logged. Returns how many connections accepted it.
    pub async fn publish(&self, notification: Notification) -> usize {
        let audience = notification.audience();
        let notification = Arc::new(notification);
        let registry = self.inner.registry.read().await;

        let targets: Vec<(ConnectionId, &Connection)> = match audience {
            Audience::Everyone => registry.connections.iter().map(|(id, c)| (*id, c)).collect(),
            Audience::Room(event_id) => registry
                .rooms
                .get(&event_id)
                .into_iter()
                .flatten()
                .filter_map(|id| registry.connections.get(id).map(|c| (*id, c)))
                .collect(),
        };

        let mut delivered = 0;
        for (connection, conn) in targets {
            match conn.tx.try_send(Arc::clone(&notification)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%connection, ?audience, "outbound queue full, notification dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%connection, ?audience, "outbound queue closed, notification dropped");
                }
            }
        }
        delivered
    }

    /// Number of connections subscribed to an event.
    pub async fn subscriber_count(&self, event_id: Uuid) -> usize {
        let registry = self.inner.registry.read().await;
        registry.rooms.get(&event_id).map_or(0, HashSet::len)
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.registry.read().await.connections.len()
    }

    /// Number of events with at least one subscriber.
    pub async fn room_count(&self) -> usize {
        self.inner.registry.read().await.rooms.len()
    }
}

impl Registry {
    fn leave_room(&mut self, event_id: Uuid, connection: ConnectionId) {
        if let Some(members) = self.rooms.get_mut(&event_id) {
            members.remove(&connection);
            if members.is_empty() {
                self.rooms.remove(&event_id);
            }
        }
    }
}
