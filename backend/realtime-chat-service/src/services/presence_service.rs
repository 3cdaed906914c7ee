use super::message_service::MessageService;
use crate::error::AppResult;
use crate::storage::UserDirectory;
use crate::websocket::{ConnectionHandle, ConnectionId, EventRouter, ServerEvent};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Announces connects and disconnects to online friends.
#[derive(Clone)]
pub struct PresenceService {
    users: Arc<dyn UserDirectory>,
    router: EventRouter,
    messages: MessageService,
    deliver_pending_on_connect: bool,
}

impl PresenceService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        router: EventRouter,
        messages: MessageService,
        deliver_pending_on_connect: bool,
    ) -> Self {
        Self {
            users,
            router,
            messages,
            deliver_pending_on_connect,
        }
    }

    /// Registers the connection and tells online friends the user is online.
    ///
    /// A connection replacing an older one of the same user still announces once.
    pub async fn connect(&self, handle: ConnectionHandle) -> AppResult<()> {
        let user_id = handle.user_id;
        let connection_id = handle.id;
        self.router.registry().register(handle).await;

        if let Err(e) = self.users.set_presence(user_id, true, Utc::now()).await {
            tracing::warn!(%user_id, error = %e, "failed to persist online presence");
        }

        let friends = self.online_friends(user_id).await?;
        self.router
            .send_to_users(&friends, &ServerEvent::UserOnline { user_id })
            .await;
        tracing::info!(%user_id, %connection_id, friends_notified = friends.len(), "user online");

        if self.deliver_pending_on_connect {
            if let Err(e) = self.messages.deliver_pending(user_id).await {
                tracing::warn!(%user_id, error = %e, "failed to deliver pending messages");
            }
        }
        Ok(())
    }

    /// Drops the connection. Returns false, without any broadcast, for a superseded connection.
    pub async fn disconnect(&self, user_id: Uuid, connection_id: ConnectionId) -> AppResult<bool> {
        if !self.router.registry().unregister(user_id, connection_id).await {
            return Ok(false);
        }

        let last_seen = Utc::now();
        if let Err(e) = self.users.set_presence(user_id, false, last_seen).await {
            tracing::warn!(%user_id, error = %e, "failed to persist last seen");
        }

        let friends = self.online_friends(user_id).await?;
        self.router
            .send_to_users(&friends, &ServerEvent::UserOffline { user_id, last_seen })
            .await;
        tracing::info!(%user_id, %connection_id, "user offline");
        Ok(true)
    }

    /// Snapshot of connected users, answered synchronously to `getOnlineUsers`.
    pub async fn online_users(&self) -> Vec<Uuid> {
        self.router.registry().all_online().await.into_iter().collect()
    }

    async fn online_friends(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let Some(user) = self.users.get_user(user_id).await? else {
            return Ok(Vec::new());
        };
        let online = self.router.registry().all_online().await;
        Ok(user
            .friends
            .into_iter()
            .filter(|friend| online.contains(friend))
            .collect())
    }
}
