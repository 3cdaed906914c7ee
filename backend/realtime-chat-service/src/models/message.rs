use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content replacing a message after it is deleted for everyone.
pub const TOMBSTONE_CONTENT: &str = "This message was deleted";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Audio,
    Gif,
    Sticker,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Audio => "audio",
            MessageType::Gif => "gif",
            MessageType::Sticker => "sticker",
        }
    }

    /// Human readable preview stored as the conversation's last message.
    pub fn summary_label(&self, content: &str) -> String {
        match self {
            MessageType::Text => content.to_string(),
            MessageType::Image => "Image".to_string(),
            MessageType::Audio => "Voice message".to_string(),
            MessageType::Gif => "GIF".to_string(),
            MessageType::Sticker => "Sticker".to_string(),
        }
    }
}

/// Delivery status. Declaration order is the only allowed direction of travel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Returns the new status if `next` moves forward, `None` otherwise.
    pub fn advance_to(self, next: MessageStatus) -> Option<MessageStatus> {
        (next > self).then_some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPreview {
    pub message_id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionGroup {
    pub emoji: String,
    pub users: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyPreview>,
    pub status: MessageStatus,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_for: Vec<Uuid>,
    pub deleted_for_everyone: bool,
    pub reactions: Vec<ReactionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when persisting a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message_type: MessageType,
    pub content: String,
    pub audio_duration: Option<f64>,
    pub reply_to: Option<ReplyPreview>,
    pub client_message_id: Option<String>,
}

impl Message {
    pub fn new(fields: NewMessage) -> Self {
        let now = Utc::now();
        let audio_duration = match fields.message_type {
            MessageType::Audio => fields.audio_duration,
            _ => None,
        };

        Self {
            id: Uuid::new_v4(),
            conversation_id: fields.conversation_id,
            sender_id: fields.sender_id,
            message_type: fields.message_type,
            content: fields.content,
            audio_duration,
            reply_to: fields.reply_to,
            status: MessageStatus::Sent,
            is_edited: false,
            edited_at: None,
            deleted_for: Vec::new(),
            deleted_for_everyone: false,
            reactions: Vec::new(),
            client_message_id: fields.client_message_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` still sees this message in their history.
    pub fn is_visible_to(&self, user: Uuid) -> bool {
        !self.deleted_for_everyone && !self.deleted_for.contains(&user)
    }

    pub fn apply_edit(&mut self, content: String, at: DateTime<Utc>) {
        self.content = content;
        self.is_edited = true;
        self.edited_at = Some(at);
        self.updated_at = at;
    }

    /// Irreversibly replaces the message with a deletion marker.
    pub fn tombstone(&mut self) {
        self.deleted_for_everyone = true;
        self.message_type = MessageType::Text;
        self.content = TOMBSTONE_CONTENT.to_string();
        self.audio_duration = None;
        self.reply_to = None;
        self.reactions.clear();
        self.updated_at = Utc::now();
    }

    /// Returns false when the user was already hiding the message.
    pub fn hide_for(&mut self, user: Uuid) -> bool {
        if self.deleted_for.contains(&user) {
            return false;
        }
        self.deleted_for.push(user);
        self.updated_at = Utc::now();
        true
    }

    /// Idempotent: a user appears at most once per emoji.
    pub fn add_reaction(&mut self, emoji: &str, user: Uuid) -> bool {
        match self.reactions.iter_mut().find(|group| group.emoji == emoji) {
            Some(group) if group.users.contains(&user) => false,
            Some(group) => {
                group.users.push(user);
                true
            }
            None => {
                self.reactions.push(ReactionGroup {
                    emoji: emoji.to_string(),
                    users: vec![user],
                });
                true
            }
        }
    }

    /// Removes the emoji group entirely once its last user is gone.
    pub fn remove_reaction(&mut self, emoji: &str, user: Uuid) -> bool {
        let Some(index) = self.reactions.iter().position(|group| group.emoji == emoji) else {
            return false;
        };

        let group = &mut self.reactions[index];
        let before = group.users.len();
        group.users.retain(|u| *u != user);
        let changed = group.users.len() != before;

        if group.users.is_empty() {
            self.reactions.remove(index);
        }
        changed
    }
}
