use super::message_types::WsInboundEvent;
use super::{ConnectionHandle, ServerEvent};
use crate::error::AppResult;
use crate::services::SendMessageRequest;
use crate::state::AppState;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Applies one inbound event for `user_id`.
///
/// Returns a reply for the calling connection only; everything else is routed by the services.
pub async fn handle_inbound(
    state: &AppState,
    user_id: Uuid,
    event: WsInboundEvent,
) -> AppResult<Option<ServerEvent>> {
    match event {
        WsInboundEvent::SendMessage {
            conversation_id,
            content,
            message_type,
            reply_to,
            audio_duration,
            client_message_id,
        } => {
            state
                .pipeline
                .send(SendMessageRequest {
                    conversation_id,
                    sender_id: user_id,
                    content,
                    message_type,
                    reply_to,
                    audio_duration,
                    client_message_id,
                })
                .await?;
        }
        WsInboundEvent::Typing { conversation_id } => {
            state.typing.typing(conversation_id, user_id, true).await?;
        }
        WsInboundEvent::StopTyping { conversation_id } => {
            state.typing.typing(conversation_id, user_id, false).await?;
        }
        WsInboundEvent::MessageRead { message_id, .. } => {
            state.messages.mark_read(message_id, user_id).await?;
        }
        WsInboundEvent::MarkConversationRead { conversation_id } => {
            state
                .messages
                .mark_conversation_read(conversation_id, user_id)
                .await?;
        }
        WsInboundEvent::MessageReaction {
            message_id,
            emoji,
            action,
        } => {
            state
                .messages
                .react(message_id, user_id, &emoji, action)
                .await?;
        }
        WsInboundEvent::EditMessage {
            message_id,
            new_content,
        } => {
            state
                .messages
                .edit_message(message_id, user_id, new_content)
                .await?;
        }
        WsInboundEvent::DeleteMessage {
            message_id,
            delete_for_everyone,
        } => {
            state
                .messages
                .delete_message(message_id, user_id, delete_for_everyone)
                .await?;
        }
        WsInboundEvent::GetOnlineUsers => {
            let user_ids = state.presence.online_users().await;
            return Ok(Some(ServerEvent::OnlineUsersList { user_ids }));
        }
    }
    Ok(None)
}

/// Drives one connection from registration to disconnect.
///
/// Inbound events are handled strictly in arrival order. The worker ends when the
/// socket side drops its sender, and only then runs the presence disconnect.
pub async fn run_session_worker(
    state: AppState,
    handle: ConnectionHandle,
    mut inbound: UnboundedReceiver<WsInboundEvent>,
) {
    let user_id = handle.user_id;
    let connection_id = handle.id;

    if let Err(e) = state.presence.connect(handle.clone()).await {
        tracing::warn!(%user_id, error = %e, "presence announcement failed");
    }
    let snapshot = ServerEvent::OnlineUsersList {
        user_ids: state.presence.online_users().await,
    };
    state.router.send_to_connection(&handle, &snapshot);

    while let Some(event) = inbound.recv().await {
        let operation = event.event_type();
        match handle_inbound(&state, user_id, event).await {
            Ok(Some(reply)) => {
                state.router.send_to_connection(&handle, &reply);
            }
            Ok(None) => {}
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(%user_id, operation, error = %e, "event failed");
                } else {
                    tracing::debug!(%user_id, operation, error = %e, "event rejected");
                }
                let reply = ServerEvent::error(e.client_message(), Some(operation));
                state.router.send_to_connection(&handle, &reply);
            }
        }
    }

    if let Err(e) = state.presence.disconnect(user_id, connection_id).await {
        tracing::warn!(%user_id, error = %e, "presence disconnect failed");
    }
}
