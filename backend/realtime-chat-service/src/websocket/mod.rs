use crate::metrics::ONLINE_CONNECTIONS;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;

pub use events::{EventRouter, ServerEvent};

/// Unique identifier for one live connection
///
/// A user reconnecting gets a fresh id, which lets a late disconnect from the
/// superseded connection be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound side of a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub user_id: Uuid,
    pub connected_at: DateTime<Utc>,
    sender: UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiver the socket writer drains.
    pub fn new(user_id: Uuid) -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            user_id,
            connected_at: Utc::now(),
            sender: tx,
        };
        (handle, rx)
    }

    /// Queues a serialized event. Returns false when the connection is gone.
    pub fn send(&self, payload: String) -> bool {
        self.sender.send(payload).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Maps each user to their single active connection.
///
/// The lock guards only the map; callers never hold it across storage or push calls.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `handle` as the user's connection, last writer wins.
    ///
    /// Returns the superseded handle, which the caller treats as stale.
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.user_id;
        let connection_id = handle.id;

        let mut guard = self.inner.write().await;
        let previous = guard.insert(user_id, handle);
        ONLINE_CONNECTIONS.set(guard.len() as i64);

        match &previous {
            Some(old) => tracing::debug!(
                %user_id,
                %connection_id,
                superseded = %old.id,
                "connection replaced existing mapping"
            ),
            None => tracing::debug!(
                %user_id,
                %connection_id,
                online = guard.len(),
                "connection registered"
            ),
        }
        previous
    }

    /// Removes the mapping only if it still points at `connection_id`.
    ///
    /// Returns false for a connection that was already superseded.
    pub async fn unregister(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        let is_current = guard
            .get(&user_id)
            .is_some_and(|current| current.id == connection_id);

        if !is_current {
            tracing::debug!(
                %user_id,
                %connection_id,
                "ignoring disconnect of superseded connection"
            );
            return false;
        }

        guard.remove(&user_id);
        ONLINE_CONNECTIONS.set(guard.len() as i64);
        tracing::debug!(%user_id, %connection_id, remaining = guard.len(), "connection removed");
        true
    }

    pub async fn lookup(&self, user_id: Uuid) -> Option<ConnectionHandle> {
        let guard = self.inner.read().await;
        guard.get(&user_id).cloned()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(&user_id)
    }

    /// Snapshot of every user with a live connection.
    pub async fn all_online(&self) -> HashSet<Uuid> {
        let guard = self.inner.read().await;
        guard.keys().copied().collect()
    }

    pub async fn online_count(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_twice_keeps_latest() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (first, _rx1) = ConnectionHandle::new(user);
        let (second, _rx2) = ConnectionHandle::new(user);
        let first_id = first.id;
        let second_id = second.id;

        assert!(registry.register(first).await.is_none());
        let superseded = registry.register(second).await;

        assert_eq!(superseded.map(|h| h.id), Some(first_id));
        assert_eq!(registry.online_count().await, 1);
        assert_eq!(registry.lookup(user).await.map(|h| h.id), Some(second_id));
    }

    #[tokio::test]
    async fn test_stale_unregister_is_noop() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (old, _rx1) = ConnectionHandle::new(user);
        let (new, _rx2) = ConnectionHandle::new(user);
        let old_id = old.id;
        let new_id = new.id;

        registry.register(old).await;
        registry.register(new).await;

        assert!(!registry.unregister(user, old_id).await);
        assert!(registry.is_online(user).await);

        assert!(registry.unregister(user, new_id).await);
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_reports_failure() {
        let (handle, rx) = ConnectionHandle::new(Uuid::new_v4());
        assert!(handle.send("ping".into()));
        drop(rx);
        assert!(!handle.send("ping".into()));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_all_online_under_concurrent_registration() {
        let registry = ConnectionRegistry::new();
        let users: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();

        let mut tasks = Vec::new();
        for user in users.clone() {
            for _ in 0..4 {
                let registry = registry.clone();
                tasks.push(tokio::spawn(async move {
                    let (handle, rx) = ConnectionHandle::new(user);
                    registry.register(handle).await;
                    rx
                }));
            }
        }
        let mut receivers = Vec::new();
        for task in tasks {
            receivers.push(task.await.unwrap());
        }

        let online = registry.all_online().await;
        assert_eq!(online.len(), users.len());
        assert!(users.iter().all(|u| online.contains(u)));
    }
}
