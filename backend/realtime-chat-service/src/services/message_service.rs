use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, MessageStatus, MessageType, ReactionGroup};
use crate::storage::{ConversationStore, MessagePatch, MessageStore};
use crate::websocket::message_types::ReactionAction;
use crate::websocket::{EventRouter, ServerEvent};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const MAX_EMOJI_BYTES: usize = 20;

/// Status transitions and mutations of existing messages.
///
/// Every mutation is persisted first and only then routed to the participants.
#[derive(Clone)]
pub struct MessageService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    router: EventRouter,
    edit_window: Option<Duration>,
}

impl MessageService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        router: EventRouter,
        edit_window: Option<Duration>,
    ) -> Self {
        Self {
            conversations,
            messages,
            router,
            edit_window,
        }
    }

    /// Conversation the user takes part in; absent and foreign look the same.
    pub async fn conversation_for(
        &self,
        conversation_id: Uuid,
        user: Uuid,
    ) -> AppResult<Conversation> {
        self.conversations
            .find_conversation(conversation_id)
            .await?
            .filter(|c| c.is_participant(user))
            .ok_or(AppError::NotFound("conversation"))
    }

    /// Message whose conversation the user takes part in.
    pub async fn message_for(
        &self,
        message_id: Uuid,
        user: Uuid,
    ) -> AppResult<(Message, Conversation)> {
        let message = self
            .messages
            .find_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        let conversation = self
            .conversation_for(message.conversation_id, user)
            .await
            .map_err(|_| AppError::NotFound("message"))?;
        Ok((message, conversation))
    }

    /// `sent -> delivered`; notifies the sender when the status moved.
    pub async fn mark_delivered(&self, message_id: Uuid) -> AppResult<bool> {
        let Some(transition) = self
            .messages
            .advance_status(message_id, MessageStatus::Delivered)
            .await?
        else {
            return Err(AppError::NotFound("message"));
        };
        if !transition.changed() {
            return Ok(false);
        }

        let message = &transition.message;
        let event = ServerEvent::MessageDelivered {
            message_id: message.id,
            conversation_id: message.conversation_id,
            auto_read: None,
        };
        self.router.send_to_user(message.sender_id, &event).await;
        Ok(true)
    }

    /// Read acknowledgment from the recipient. The sender reading their own message is a no-op.
    pub async fn mark_read(&self, message_id: Uuid, reader: Uuid) -> AppResult<bool> {
        let (message, _) = self.message_for(message_id, reader).await?;
        if message.sender_id == reader {
            return Ok(false);
        }

        let transition = self
            .messages
            .advance_status(message_id, MessageStatus::Read)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        if !transition.changed() {
            return Ok(false);
        }

        let event = ServerEvent::MessageRead {
            message_id,
            conversation_id: message.conversation_id,
            read_by: reader,
        };
        self.router.send_to_user(message.sender_id, &event).await;
        Ok(true)
    }

    /// Marks every unread message from the other side as read.
    ///
    /// Returns the number of messages that changed; a repeated call returns 0 and emits nothing.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        reader: Uuid,
    ) -> AppResult<usize> {
        self.conversation_for(conversation_id, reader).await?;

        let changed = self.messages.mark_many_read(conversation_id, reader).await?;
        for message in &changed {
            let event = ServerEvent::MessageRead {
                message_id: message.id,
                conversation_id,
                read_by: reader,
            };
            self.router.send_to_user(message.sender_id, &event).await;
        }

        tracing::debug!(
            %conversation_id,
            %reader,
            count = changed.len(),
            "conversation marked read"
        );
        Ok(changed.len())
    }

    pub async fn edit_message(
        &self,
        message_id: Uuid,
        editor: Uuid,
        new_content: String,
    ) -> AppResult<Message> {
        let (message, conversation) = self.message_for(message_id, editor).await?;
        if message.sender_id != editor {
            return Err(AppError::Unauthorized);
        }
        if message.deleted_for_everyone {
            return Err(AppError::MessageDeleted);
        }
        if message.message_type != MessageType::Text {
            return Err(AppError::BadRequest("Only text messages can be edited".into()));
        }
        if new_content.trim().is_empty() {
            return Err(AppError::BadRequest("Message content is required".into()));
        }
        if let Some(window) = self.edit_window {
            if Utc::now() - message.created_at > window {
                return Err(AppError::EditWindowExpired {
                    max_edit_minutes: window.num_minutes(),
                });
            }
        }

        let edited = self
            .messages
            .update_message(
                message_id,
                MessagePatch::Edit {
                    content: new_content,
                    edited_at: Utc::now(),
                },
            )
            .await?
            .ok_or(AppError::NotFound("message"))?;

        let event = ServerEvent::MessageEdited {
            message_id,
            conversation_id: edited.conversation_id,
            content: edited.content.clone(),
            is_edited: edited.is_edited,
            edited_at: edited.edited_at,
        };
        self.router
            .send_to_users(&conversation.participants.members(), &event)
            .await;
        Ok(edited)
    }

    /// Sender-only. For everyone tombstones the message for both sides; otherwise it is
    /// hidden for the requester alone and only the requester is notified.
    pub async fn delete_message(
        &self,
        message_id: Uuid,
        requester: Uuid,
        for_everyone: bool,
    ) -> AppResult<Message> {
        let (message, conversation) = self.message_for(message_id, requester).await?;
        if message.sender_id != requester {
            return Err(AppError::Unauthorized);
        }
        if message.deleted_for_everyone {
            return Err(AppError::MessageDeleted);
        }

        let patch = if for_everyone {
            MessagePatch::DeleteForEveryone
        } else {
            MessagePatch::DeleteFor(requester)
        };
        let updated = self
            .messages
            .update_message(message_id, patch)
            .await?
            .ok_or(AppError::NotFound("message"))?;

        if for_everyone {
            let event = ServerEvent::MessageDeleted {
                message_id,
                conversation_id: conversation.id,
                deleted_for_everyone: Some(true),
                deleted_for_me: None,
            };
            self.router
                .send_to_users(&conversation.participants.members(), &event)
                .await;
        } else {
            let event = ServerEvent::MessageDeleted {
                message_id,
                conversation_id: conversation.id,
                deleted_for_everyone: None,
                deleted_for_me: Some(true),
            };
            self.router.send_to_user(requester, &event).await;
        }

        tracing::info!(%message_id, %requester, for_everyone, "message deleted");
        Ok(updated)
    }

    /// Applies one reaction mutation and routes the full reaction list to both participants.
    pub async fn react(
        &self,
        message_id: Uuid,
        user: Uuid,
        emoji: &str,
        action: ReactionAction,
    ) -> AppResult<Vec<ReactionGroup>> {
        if emoji.is_empty() || emoji.len() > MAX_EMOJI_BYTES {
            return Err(AppError::BadRequest(format!(
                "Emoji must be 1-{MAX_EMOJI_BYTES} bytes"
            )));
        }

        let (message, conversation) = self.message_for(message_id, user).await?;
        if message.deleted_for_everyone {
            return Err(AppError::MessageDeleted);
        }

        let patch = match action {
            ReactionAction::Add => MessagePatch::AddReaction {
                emoji: emoji.to_string(),
                user,
            },
            ReactionAction::Remove => MessagePatch::RemoveReaction {
                emoji: emoji.to_string(),
                user,
            },
        };
        let updated = self
            .messages
            .update_message(message_id, patch)
            .await?
            .ok_or(AppError::NotFound("message"))?;

        let event = ServerEvent::MessageReactionUpdate {
            message_id,
            conversation_id: conversation.id,
            reactions: updated.reactions.clone(),
        };
        self.router
            .send_to_users(&conversation.participants.members(), &event)
            .await;
        Ok(updated.reactions)
    }

    /// Moves every message left `sent` for `recipient` to `delivered` and notifies the senders.
    pub async fn deliver_pending(&self, recipient: Uuid) -> AppResult<usize> {
        let conversations = self.conversations.list_conversations_for(recipient).await?;

        let mut delivered = 0;
        for conversation in conversations {
            let changed = self
                .messages
                .mark_pending_delivered(conversation.id, recipient)
                .await?;
            for message in &changed {
                let event = ServerEvent::MessageDelivered {
                    message_id: message.id,
                    conversation_id: conversation.id,
                    auto_read: None,
                };
                self.router.send_to_user(message.sender_id, &event).await;
            }
            delivered += changed.len();
        }

        if delivered > 0 {
            tracing::info!(%recipient, delivered, "delivered messages queued while offline");
        }
        Ok(delivered)
    }
}
