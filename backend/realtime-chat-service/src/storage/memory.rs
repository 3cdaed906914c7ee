use super::{
    ConversationStore, CreatedMessage, MessagePatch, MessageStore, Page, StatusTransition,
    UserDirectory,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, LastMessageSummary, Message, MessageStatus, NewMessage, ParticipantPair,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Message>,
    // conversation_id -> message ids in creation order
    timeline: HashMap<Uuid, Vec<Uuid>>,
    // (sender, client_message_id) -> message id
    client_ids: HashMap<(Uuid, String), Uuid>,
}

impl Inner {
    fn timeline_ids(&self, conversation_id: Uuid) -> Vec<Uuid> {
        self.timeline.get(&conversation_id).cloned().unwrap_or_default()
    }
}

/// In-process store implementing every storage trait.
///
/// All state sits behind one lock so each call is a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserProfile) {
        let mut guard = self.inner.write().await;
        guard.users.insert(user.id, user);
    }

    /// Records a symmetric friendship. Unknown ids are ignored.
    pub async fn add_friendship(&self, a: Uuid, b: Uuid) {
        let mut guard = self.inner.write().await;
        if !guard.users.contains_key(&a) || !guard.users.contains_key(&b) {
            tracing::warn!(%a, %b, "friendship references unknown user");
            return;
        }
        for (user, friend) in [(a, b), (b, a)] {
            if let Some(profile) = guard.users.get_mut(&user) {
                if !profile.friends.contains(&friend) {
                    profile.friends.push(friend);
                }
            }
        }
    }

    /// Seeds user profiles from a JSON array. Friend lists are made symmetric.
    pub async fn load_users_from_file(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("cannot read seed users {}: {e}", path.display()))
        })?;
        let users: Vec<UserProfile> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("invalid seed users {}: {e}", path.display()))
        })?;

        let pairs: Vec<(Uuid, Uuid)> = users
            .iter()
            .flat_map(|u| u.friends.iter().map(move |f| (u.id, *f)))
            .collect();
        let count = users.len();

        for mut user in users {
            user.friends.clear();
            self.insert_user(user).await;
        }
        for (a, b) in pairs {
            self.add_friendship(a, b).await;
        }

        tracing::info!(count, path = %path.display(), "seeded user directory");
        Ok(count)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let guard = self.inner.read().await;
        Ok(guard.conversations.get(&id).cloned())
    }

    async fn find_conversation_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let guard = self.inner.read().await;
        Ok(guard
            .conversations
            .values()
            .find(|c| c.is_participant(a) && c.is_participant(b))
            .cloned())
    }

    async fn create_conversation(&self, participants: ParticipantPair) -> AppResult<Conversation> {
        let mut guard = self.inner.write().await;
        let [a, b] = participants.members();
        // another request may have created the pair since the caller looked
        if let Some(existing) = guard
            .conversations
            .values()
            .find(|c| c.is_participant(a) && c.is_participant(b))
        {
            return Ok(existing.clone());
        }

        let conversation = Conversation::new(participants);
        guard.conversations.insert(conversation.id, conversation.clone());
        guard.timeline.insert(conversation.id, Vec::new());
        Ok(conversation)
    }

    async fn list_conversations_for(&self, user: Uuid) -> AppResult<Vec<Conversation>> {
        let guard = self.inner.read().await;
        let mut conversations: Vec<Conversation> = guard
            .conversations
            .values()
            .filter(|c| c.is_participant(user))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn update_last_message(
        &self,
        id: Uuid,
        summary: LastMessageSummary,
    ) -> AppResult<Conversation> {
        let mut guard = self.inner.write().await;
        let conversation = guard
            .conversations
            .get_mut(&id)
            .ok_or(AppError::NotFound("conversation"))?;
        conversation.updated_at = summary.timestamp;
        conversation.last_message = Some(summary);
        Ok(conversation.clone())
    }

    async fn set_muted(&self, id: Uuid, user: Uuid, muted: bool) -> AppResult<Conversation> {
        let mut guard = self.inner.write().await;
        let conversation = guard
            .conversations
            .get_mut(&id)
            .ok_or(AppError::NotFound("conversation"))?;
        conversation.set_muted(user, muted);
        Ok(conversation.clone())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(&self, fields: NewMessage) -> AppResult<CreatedMessage> {
        let mut guard = self.inner.write().await;
        if !guard.conversations.contains_key(&fields.conversation_id) {
            return Err(AppError::NotFound("conversation"));
        }
        if let Some(key) = &fields.client_message_id {
            let existing = guard
                .client_ids
                .get(&(fields.sender_id, key.clone()))
                .and_then(|id| guard.messages.get(id));
            if let Some(existing) = existing {
                return Ok(CreatedMessage::Existing(existing.clone()));
            }
        }

        let message = Message::new(fields);
        if let Some(key) = &message.client_message_id {
            guard
                .client_ids
                .insert((message.sender_id, key.clone()), message.id);
        }
        guard
            .timeline
            .entry(message.conversation_id)
            .or_default()
            .push(message.id);
        guard.messages.insert(message.id, message.clone());
        Ok(CreatedMessage::Created(message))
    }

    async fn find_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        let guard = self.inner.read().await;
        Ok(guard.messages.get(&id).cloned())
    }

    async fn find_by_client_id(
        &self,
        sender: Uuid,
        client_message_id: &str,
    ) -> AppResult<Option<Message>> {
        let guard = self.inner.read().await;
        Ok(guard
            .client_ids
            .get(&(sender, client_message_id.to_string()))
            .and_then(|id| guard.messages.get(id))
            .cloned())
    }

    async fn advance_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> AppResult<Option<StatusTransition>> {
        let mut guard = self.inner.write().await;
        let Some(message) = guard.messages.get_mut(&id) else {
            return Ok(None);
        };

        let previous = message.status;
        if let Some(next) = previous.advance_to(status) {
            message.status = next;
            message.updated_at = Utc::now();
        }
        Ok(Some(StatusTransition {
            message: message.clone(),
            previous,
        }))
    }

    async fn update_message(&self, id: Uuid, patch: MessagePatch) -> AppResult<Option<Message>> {
        let mut guard = self.inner.write().await;
        let Some(message) = guard.messages.get_mut(&id) else {
            return Ok(None);
        };
        if message.deleted_for_everyone {
            return Err(AppError::MessageDeleted);
        }

        match patch {
            MessagePatch::Edit { content, edited_at } => message.apply_edit(content, edited_at),
            MessagePatch::DeleteForEveryone => message.tombstone(),
            MessagePatch::DeleteFor(user) => {
                message.hide_for(user);
            }
            MessagePatch::AddReaction { emoji, user } => {
                if message.add_reaction(&emoji, user) {
                    message.updated_at = Utc::now();
                }
            }
            MessagePatch::RemoveReaction { emoji, user } => {
                if message.remove_reaction(&emoji, user) {
                    message.updated_at = Utc::now();
                }
            }
        }
        Ok(Some(message.clone()))
    }

    async fn mark_many_read(&self, conversation_id: Uuid, reader: Uuid) -> AppResult<Vec<Message>> {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        let mut changed = Vec::new();
        for id in guard.timeline_ids(conversation_id) {
            let Some(message) = guard.messages.get_mut(&id) else {
                continue;
            };
            if message.sender_id == reader {
                continue;
            }
            if let Some(next) = message.status.advance_to(MessageStatus::Read) {
                message.status = next;
                message.updated_at = now;
                changed.push(message.clone());
            }
        }
        Ok(changed)
    }

    async fn mark_pending_delivered(
        &self,
        conversation_id: Uuid,
        recipient: Uuid,
    ) -> AppResult<Vec<Message>> {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        let mut changed = Vec::new();
        for id in guard.timeline_ids(conversation_id) {
            let Some(message) = guard.messages.get_mut(&id) else {
                continue;
            };
            if message.sender_id == recipient
                || message.status != MessageStatus::Sent
                || message.deleted_for_everyone
            {
                continue;
            }
            message.status = MessageStatus::Delivered;
            message.updated_at = now;
            changed.push(message.clone());
        }
        Ok(changed)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        page: Page,
    ) -> AppResult<Vec<Message>> {
        let guard = self.inner.read().await;
        let visible: Vec<&Message> = guard
            .timeline
            .get(&conversation_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| guard.messages.get(id))
                    .filter(|m| m.is_visible_to(viewer))
                    .collect()
            })
            .unwrap_or_default();

        let limit = page.limit.max(1);
        let skip_newest = page.number.saturating_sub(1).saturating_mul(limit);
        let end = visible.len().saturating_sub(skip_newest);
        let start = end.saturating_sub(limit);
        Ok(visible[start..end].iter().map(|m| (*m).clone()).collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let guard = self.inner.read().await;
        Ok(guard.users.get(&id).cloned())
    }

    async fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let user = guard.users.get_mut(&id).ok_or(AppError::NotFound("user"))?;
        user.is_online = online;
        user.last_seen = Some(last_seen);
        Ok(())
    }
}
