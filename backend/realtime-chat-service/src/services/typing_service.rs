use super::message_service::MessageService;
use crate::error::{AppError, AppResult};
use crate::websocket::{EventRouter, ServerEvent};
use uuid::Uuid;

/// Ephemeral typing indicators, routed to the other participant only. Nothing is stored.
#[derive(Clone)]
pub struct TypingService {
    messages: MessageService,
    router: EventRouter,
}

impl TypingService {
    pub fn new(messages: MessageService, router: EventRouter) -> Self {
        Self { messages, router }
    }

    pub async fn typing(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<()> {
        let conversation = self
            .messages
            .conversation_for(conversation_id, user_id)
            .await?;
        let other = conversation
            .other_participant(user_id)
            .ok_or(AppError::NotFound("conversation"))?;

        let event = if active {
            ServerEvent::UserTyping {
                user_id,
                conversation_id,
            }
        } else {
            ServerEvent::UserStoppedTyping {
                user_id,
                conversation_id,
            }
        };
        self.router.send_to_user(other, &event).await;
        Ok(())
    }
}
