use super::{ConnectionHandle, ConnectionRegistry};
use crate::metrics;
use crate::models::{Conversation, Message, ReactionGroup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed from the server to connected clients.
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    NewMessage {
        message: Message,
        conversation: Conversation,
    },
    MessageDelivered {
        message_id: Uuid,
        conversation_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto_read: Option<bool>,
    },
    MessageRead {
        message_id: Uuid,
        conversation_id: Uuid,
        read_by: Uuid,
    },
    UserTyping {
        user_id: Uuid,
        conversation_id: Uuid,
    },
    UserStoppedTyping {
        user_id: Uuid,
        conversation_id: Uuid,
    },
    UserOnline {
        user_id: Uuid,
    },
    UserOffline {
        user_id: Uuid,
        last_seen: DateTime<Utc>,
    },
    OnlineUsersList {
        user_ids: Vec<Uuid>,
    },
    MessageReactionUpdate {
        message_id: Uuid,
        conversation_id: Uuid,
        reactions: Vec<ReactionGroup>,
    },
    MessageEdited {
        message_id: Uuid,
        conversation_id: Uuid,
        content: String,
        is_edited: bool,
        edited_at: Option<DateTime<Utc>>,
    },
    MessageDeleted {
        message_id: Uuid,
        conversation_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deleted_for_everyone: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deleted_for_me: Option<bool>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage { .. } => "newMessage",
            ServerEvent::MessageDelivered { .. } => "messageDelivered",
            ServerEvent::MessageRead { .. } => "messageRead",
            ServerEvent::UserTyping { .. } => "userTyping",
            ServerEvent::UserStoppedTyping { .. } => "userStoppedTyping",
            ServerEvent::UserOnline { .. } => "userOnline",
            ServerEvent::UserOffline { .. } => "userOffline",
            ServerEvent::OnlineUsersList { .. } => "onlineUsersList",
            ServerEvent::MessageReactionUpdate { .. } => "messageReactionUpdate",
            ServerEvent::MessageEdited { .. } => "messageEdited",
            ServerEvent::MessageDeleted { .. } => "messageDeleted",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn to_payload(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::error!(event = self.event_type(), error = %e, "failed to serialize event");
                None
            }
        }
    }

    pub fn error(message: impl Into<String>, operation: Option<&str>) -> Self {
        ServerEvent::Error {
            message: message.into(),
            operation: operation.map(str::to_string),
        }
    }
}

/// Delivers events to users through their registered connection.
///
/// A missing or closed connection is a normal outcome and never fails the caller.
#[derive(Clone)]
pub struct EventRouter {
    registry: ConnectionRegistry,
}

impl EventRouter {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Returns true when the event was queued on the user's connection.
    pub async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) -> bool {
        let Some(payload) = event.to_payload() else {
            return false;
        };
        self.deliver(user_id, event.event_type(), payload).await
    }

    /// Serializes once, then delivers to each user independently.
    ///
    /// Returns how many users actually received the event.
    pub async fn send_to_users(&self, user_ids: &[Uuid], event: &ServerEvent) -> usize {
        let Some(payload) = event.to_payload() else {
            return 0;
        };

        let mut delivered = 0;
        for user_id in user_ids {
            if self
                .deliver(*user_id, event.event_type(), payload.clone())
                .await
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Direct reply on a specific connection, bypassing the registry.
    pub fn send_to_connection(&self, handle: &ConnectionHandle, event: &ServerEvent) -> bool {
        let Some(payload) = event.to_payload() else {
            return false;
        };
        let sent = handle.send(payload);
        metrics::record_event_routed(event.event_type(), outcome(sent));
        sent
    }

    async fn deliver(&self, user_id: Uuid, event_type: &'static str, payload: String) -> bool {
        // the registry read lock is released before the send
        let sent = match self.registry.lookup(user_id).await {
            Some(handle) => handle.send(payload),
            None => false,
        };

        if !sent {
            tracing::debug!(%user_id, event = event_type, "recipient not connected, event dropped");
        }
        metrics::record_event_routed(event_type, outcome(sent));
        sent
    }
}

fn outcome(sent: bool) -> &'static str {
    if sent {
        "delivered"
    } else {
        "offline"
    }
}
