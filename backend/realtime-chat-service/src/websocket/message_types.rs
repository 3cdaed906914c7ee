use crate::models::MessageType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Add,
    Remove,
}

/// Inbound events from client to server
///
/// Same envelope as outbound events: `{"event": "sendMessage", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum WsInboundEvent {
    SendMessage {
        conversation_id: Uuid,
        content: String,
        #[serde(rename = "type", default)]
        message_type: MessageType,
        #[serde(default)]
        reply_to: Option<Uuid>,
        #[serde(default)]
        audio_duration: Option<f64>,
        /// Client-side queue id, used to drop replays of an accepted message
        #[serde(default)]
        client_message_id: Option<String>,
    },
    Typing {
        conversation_id: Uuid,
    },
    StopTyping {
        conversation_id: Uuid,
    },
    MessageRead {
        message_id: Uuid,
        conversation_id: Uuid,
    },
    MarkConversationRead {
        conversation_id: Uuid,
    },
    MessageReaction {
        message_id: Uuid,
        emoji: String,
        action: ReactionAction,
    },
    EditMessage {
        message_id: Uuid,
        new_content: String,
    },
    DeleteMessage {
        message_id: Uuid,
        #[serde(default)]
        delete_for_everyone: bool,
    },
    GetOnlineUsers,
}

impl WsInboundEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WsInboundEvent::SendMessage { .. } => "sendMessage",
            WsInboundEvent::Typing { .. } => "typing",
            WsInboundEvent::StopTyping { .. } => "stopTyping",
            WsInboundEvent::MessageRead { .. } => "messageRead",
            WsInboundEvent::MarkConversationRead { .. } => "markConversationRead",
            WsInboundEvent::MessageReaction { .. } => "messageReaction",
            WsInboundEvent::EditMessage { .. } => "editMessage",
            WsInboundEvent::DeleteMessage { .. } => "deleteMessage",
            WsInboundEvent::GetOnlineUsers => "getOnlineUsers",
        }
    }
}
