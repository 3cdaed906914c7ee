use super::message_service::MessageService;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, ParticipantPair};
use crate::storage::{Page, Storage};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Clone)]
pub struct ConversationService {
    storage: Storage,
    messages: MessageService,
}

impl ConversationService {
    pub fn new(storage: Storage, messages: MessageService) -> Self {
        Self { storage, messages }
    }

    /// Returns the direct conversation between two friends, creating it on first use.
    pub async fn find_or_create(&self, initiator: Uuid, other: Uuid) -> AppResult<Conversation> {
        let participants = ParticipantPair::new(initiator, other)?;

        let user = self
            .storage
            .users
            .get_user(initiator)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        if self.storage.users.get_user(other).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }
        if !user.is_friend(other) {
            return Err(AppError::Forbidden);
        }

        if let Some(existing) = self
            .storage
            .conversations
            .find_conversation_between(initiator, other)
            .await?
        {
            return Ok(existing);
        }

        let conversation = self
            .storage
            .conversations
            .create_conversation(participants)
            .await?;
        tracing::info!(
            conversation_id = %conversation.id,
            %initiator,
            %other,
            "conversation created"
        );
        Ok(conversation)
    }

    pub async fn list_for(&self, user: Uuid) -> AppResult<Vec<Conversation>> {
        self.storage.conversations.list_conversations_for(user).await
    }

    /// Paged history as seen by `viewer`; `limit` is clamped to 1..=100.
    pub async fn history(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> AppResult<Vec<Message>> {
        self.messages.conversation_for(conversation_id, viewer).await?;

        let page = Page {
            number: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        };
        self.storage
            .messages
            .list_messages(conversation_id, viewer, page)
            .await
    }

    pub async fn set_muted(
        &self,
        conversation_id: Uuid,
        user: Uuid,
        muted: bool,
    ) -> AppResult<Conversation> {
        self.messages.conversation_for(conversation_id, user).await?;
        self.storage
            .conversations
            .set_muted(conversation_id, user, muted)
            .await
    }
}
