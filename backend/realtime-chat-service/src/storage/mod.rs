//! Persistence boundary.
//!
//! The chat core only talks to storage through these traits. `MemoryStore` is the
//! bundled implementation used by the binary and by tests.

use crate::error::AppResult;
use crate::models::{
    Conversation, LastMessageSummary, Message, MessageStatus, NewMessage, ParticipantPair,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryStore;

/// Single atomic mutation applied to a stored message.
#[derive(Debug, Clone)]
pub enum MessagePatch {
    Edit {
        content: String,
        edited_at: DateTime<Utc>,
    },
    DeleteForEveryone,
    DeleteFor(Uuid),
    AddReaction {
        emoji: String,
        user: Uuid,
    },
    RemoveReaction {
        emoji: String,
        user: Uuid,
    },
}

/// Result of a forward status move.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub message: Message,
    pub previous: MessageStatus,
}

impl StatusTransition {
    pub fn changed(&self) -> bool {
        self.message.status != self.previous
    }
}

/// Result of `create_message`. A repeated `(sender, client_message_id)` gets the
/// message stored the first time.
#[derive(Debug, Clone)]
pub enum CreatedMessage {
    Created(Message),
    Existing(Message),
}

impl CreatedMessage {
    pub fn into_message(self) -> Message {
        match self {
            CreatedMessage::Created(message) | CreatedMessage::Existing(message) => message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based, page 1 holds the newest messages
    pub number: usize,
    pub limit: usize,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;

    async fn find_conversation_between(&self, a: Uuid, b: Uuid)
        -> AppResult<Option<Conversation>>;

    async fn create_conversation(&self, participants: ParticipantPair) -> AppResult<Conversation>;

    /// Most recently updated first.
    async fn list_conversations_for(&self, user: Uuid) -> AppResult<Vec<Conversation>>;

    async fn update_last_message(
        &self,
        id: Uuid,
        summary: LastMessageSummary,
    ) -> AppResult<Conversation>;

    async fn set_muted(&self, id: Uuid, user: Uuid, muted: bool) -> AppResult<Conversation>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Checks the client message id and inserts in one step.
    async fn create_message(&self, fields: NewMessage) -> AppResult<CreatedMessage>;

    async fn find_message(&self, id: Uuid) -> AppResult<Option<Message>>;

    async fn find_by_client_id(&self, sender: Uuid, client_message_id: &str)
        -> AppResult<Option<Message>>;

    /// Moves the status forward only; a backwards or equal target leaves it untouched.
    async fn advance_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> AppResult<Option<StatusTransition>>;

    async fn update_message(&self, id: Uuid, patch: MessagePatch) -> AppResult<Option<Message>>;

    /// Marks every unread message not sent by `reader` as read and returns only those it moved.
    async fn mark_many_read(&self, conversation_id: Uuid, reader: Uuid) -> AppResult<Vec<Message>>;

    /// Moves `sent` messages addressed to `recipient` to `delivered`.
    async fn mark_pending_delivered(
        &self,
        conversation_id: Uuid,
        recipient: Uuid,
    ) -> AppResult<Vec<Message>>;

    /// History visible to `viewer`, oldest first within the page.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        page: Page,
    ) -> AppResult<Vec<Message>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<UserProfile>>;

    async fn set_presence(&self, id: Uuid, online: bool, last_seen: DateTime<Utc>)
        -> AppResult<()>;
}

/// Handles to every storage collaborator the core uses.
#[derive(Clone)]
pub struct Storage {
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl Storage {
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            conversations: store.clone(),
            messages: store.clone(),
            users: store,
        }
    }
}
