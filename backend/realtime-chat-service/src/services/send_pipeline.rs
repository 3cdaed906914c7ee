use super::message_service::MessageService;
use super::notification_producer::{message_push_payload, PushSender};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    Conversation, LastMessageSummary, Message, MessageStatus, MessageType, NewMessage,
    ReplyPreview,
};
use crate::storage::{CreatedMessage, Storage};
use crate::websocket::{EventRouter, ServerEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<Uuid>,
    pub audio_duration: Option<f64>,
    pub client_message_id: Option<String>,
}

#[derive(Debug)]
pub struct SendOutcome {
    pub message: Message,
    pub conversation: Conversation,
    /// The recipient was connected and the message moved to `delivered`.
    pub delivered: bool,
    /// A replay of a message already accepted under the same client id.
    pub duplicate: bool,
    /// Background push for an offline recipient. Never awaited by the pipeline.
    pub push_task: Option<JoinHandle<()>>,
}

/// Persist, summarize, route, then either mark delivered or push.
#[derive(Clone)]
pub struct SendPipeline {
    storage: Storage,
    router: EventRouter,
    messages: MessageService,
    push: Arc<dyn PushSender>,
}

impl SendPipeline {
    pub fn new(
        storage: Storage,
        router: EventRouter,
        messages: MessageService,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            storage,
            router,
            messages,
            push,
        }
    }

    pub async fn send(&self, request: SendMessageRequest) -> AppResult<SendOutcome> {
        if request.content.trim().is_empty() {
            return Err(AppError::BadRequest("Message content is required".into()));
        }

        let conversation = self
            .storage
            .conversations
            .find_conversation(request.conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        let recipient = conversation
            .other_participant(request.sender_id)
            .ok_or(AppError::NotFound("conversation"))?;

        if let Some(key) = request.client_message_id.as_deref() {
            if let Some(existing) = self
                .storage
                .messages
                .find_by_client_id(request.sender_id, key)
                .await?
            {
                return Ok(self.echo_duplicate(existing, conversation).await);
            }
        }

        let reply_to = match request.reply_to {
            Some(reply_id) => Some(self.reply_preview(conversation.id, reply_id).await?),
            None => None,
        };

        let created = self
            .storage
            .messages
            .create_message(NewMessage {
                conversation_id: conversation.id,
                sender_id: request.sender_id,
                message_type: request.message_type,
                content: request.content,
                audio_duration: request.audio_duration,
                reply_to,
                client_message_id: request.client_message_id,
            })
            .await?;
        // a concurrent send with the same key got there first
        let mut message = match created {
            CreatedMessage::Created(message) => message,
            CreatedMessage::Existing(existing) => {
                return Ok(self.echo_duplicate(existing, conversation).await);
            }
        };
        metrics::record_message_sent(message.message_type.as_str());

        let summary = LastMessageSummary {
            text: message.message_type.summary_label(&message.content),
            sender_id: message.sender_id,
            timestamp: message.created_at,
        };
        let conversation = self
            .storage
            .conversations
            .update_last_message(conversation.id, summary)
            .await?;

        let event = ServerEvent::NewMessage {
            message: message.clone(),
            conversation: conversation.clone(),
        };
        self.router
            .send_to_users(&conversation.participants.members(), &event)
            .await;

        let mut delivered = false;
        let mut push_task = None;

        if self.router.registry().is_online(recipient).await {
            // the message is already persisted and routed; a failure here is not rolled back
            match self.messages.mark_delivered(message.id).await {
                Ok(_) => {
                    delivered = true;
                    message.status = message
                        .status
                        .advance_to(MessageStatus::Delivered)
                        .unwrap_or(message.status);
                    let hint = ServerEvent::MessageDelivered {
                        message_id: message.id,
                        conversation_id: conversation.id,
                        auto_read: Some(true),
                    };
                    self.router.send_to_user(recipient, &hint).await;
                }
                Err(e) => {
                    tracing::error!(
                        message_id = %message.id,
                        error = %e,
                        "failed to mark delivered"
                    );
                }
            }
        } else if conversation.is_muted_by(recipient) {
            tracing::debug!(
                %recipient,
                conversation_id = %conversation.id,
                "recipient muted, push skipped"
            );
        } else {
            push_task = Some(self.spawn_push(recipient, message.clone()));
        }

        tracing::info!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            sender_id = %message.sender_id,
            delivered,
            "message sent"
        );

        Ok(SendOutcome {
            message,
            conversation,
            delivered,
            duplicate: false,
            push_task,
        })
    }

    /// Echoes the stored copy back to the sender only; nothing is routed or pushed again.
    async fn echo_duplicate(&self, existing: Message, conversation: Conversation) -> SendOutcome {
        tracing::info!(
            message_id = %existing.id,
            client_message_id = existing.client_message_id.as_deref().unwrap_or_default(),
            "duplicate send ignored"
        );
        let event = ServerEvent::NewMessage {
            message: existing.clone(),
            conversation: conversation.clone(),
        };
        self.router.send_to_user(existing.sender_id, &event).await;
        SendOutcome {
            message: existing,
            conversation,
            delivered: false,
            duplicate: true,
            push_task: None,
        }
    }

    async fn reply_preview(
        &self,
        conversation_id: Uuid,
        reply_id: Uuid,
    ) -> AppResult<ReplyPreview> {
        let target = self
            .storage
            .messages
            .find_message(reply_id)
            .await?
            .filter(|m| m.conversation_id == conversation_id)
            .ok_or(AppError::NotFound("message"))?;
        Ok(ReplyPreview {
            message_id: target.id,
            content: target.content,
            sender_id: target.sender_id,
        })
    }

    fn spawn_push(&self, recipient: Uuid, message: Message) -> JoinHandle<()> {
        let users = self.storage.users.clone();
        let push = self.push.clone();

        tokio::spawn(async move {
            let sender = match users.get_user(message.sender_id).await {
                Ok(sender) => sender,
                Err(e) => {
                    tracing::warn!(
                        sender_id = %message.sender_id,
                        error = %e,
                        "sender lookup failed for push"
                    );
                    None
                }
            };
            let payload = message_push_payload(sender.as_ref(), &message);

            match push.send_push(recipient, payload).await {
                Ok(()) => metrics::record_push("sent"),
                Err(e) => {
                    metrics::record_push("failed");
                    tracing::warn!(
                        %recipient,
                        message_id = %message.id,
                        error = %e,
                        "push notification failed"
                    );
                }
            }
        })
    }
}
