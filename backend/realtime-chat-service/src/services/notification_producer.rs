//! Push notification producer
//!
//! Builds the notification for a recipient who was offline when a message
//! arrived and hands it to a `PushSender`. The default sender only logs; with
//! the `kafka` feature the payload is published for the notification service.

use crate::error::AppResult;
use crate::models::{Message, MessageType, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PUSH_ICON: &str = "/icon-192x192.png";
const PREVIEW_MAX_CHARS: usize = 100;

/// Payload handed to the push collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(&self, user_id: Uuid, payload: PushPayload) -> AppResult<()>;
}

/// Sender used when no push backend is configured.
#[derive(Debug, Default, Clone)]
pub struct LogPushSender;

#[async_trait]
impl PushSender for LogPushSender {
    async fn send_push(&self, user_id: Uuid, payload: PushPayload) -> AppResult<()> {
        tracing::info!(
            %user_id,
            title = %payload.title,
            body = %payload.body,
            "push notification (no push backend configured)"
        );
        Ok(())
    }
}

/// Notification for a new message; `sender` is `None` when the profile lookup failed.
pub fn message_push_payload(sender: Option<&UserProfile>, message: &Message) -> PushPayload {
    let body = match message.message_type {
        MessageType::Text => truncate_message_preview(&message.content, PREVIEW_MAX_CHARS),
        MessageType::Image => "📷 Sent an image".to_string(),
        MessageType::Audio => "🎤 Sent a voice message".to_string(),
        MessageType::Gif => "🎬 Sent a GIF".to_string(),
        MessageType::Sticker => format!("🎨 {}", message.content),
    };

    PushPayload {
        title: sender
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| "New message".to_string()),
        body,
        icon: sender
            .and_then(|s| s.avatar_url.clone())
            .unwrap_or_else(|| DEFAULT_PUSH_ICON.to_string()),
        data: serde_json::json!({
            "type": "message",
            "conversationId": message.conversation_id,
            "messageId": message.id,
            "senderId": message.sender_id,
        }),
    }
}

/// Truncate message preview to a maximum length, adding ellipsis if needed
pub fn truncate_message_preview(message: &str, max_len: usize) -> String {
    if message.chars().count() <= max_len {
        message.to_string()
    } else {
        let truncated: String = message.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaPushSender;

#[cfg(feature = "kafka")]
mod kafka {
    use super::{PushPayload, PushSender};
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use serde::Serialize;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Debug, Serialize)]
    struct PushRecord<'a> {
        id: String,
        user_id: Uuid,
        event_type: &'static str,
        #[serde(flatten)]
        payload: &'a PushPayload,
        timestamp: i64,
    }

    /// Publishes push payloads to the notification topic
    #[derive(Clone)]
    pub struct KafkaPushSender {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaPushSender {
        pub fn new(brokers: &str, topic: &str) -> AppResult<Self> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .set("acks", "all")
                .set("retries", "3")
                .set("retry.backoff.ms", "100")
                .create()
                .map_err(|e| AppError::Config(format!("Failed to create Kafka producer: {e}")))?;

            tracing::info!(brokers = %brokers, topic = %topic, "KafkaPushSender initialized");

            Ok(Self {
                producer,
                topic: topic.to_string(),
            })
        }
    }

    #[async_trait]
    impl PushSender for KafkaPushSender {
        async fn send_push(&self, user_id: Uuid, payload: PushPayload) -> AppResult<()> {
            let record = PushRecord {
                id: Uuid::new_v4().to_string(),
                user_id,
                event_type: "message",
                payload: &payload,
                timestamp: Utc::now().timestamp(),
            };
            let body = serde_json::to_string(&record)
                .map_err(|e| AppError::Push(format!("Failed to serialize notification: {e}")))?;
            let key = user_id.to_string();

            match self
                .producer
                .send(
                    FutureRecord::to(&self.topic).key(&key).payload(&body),
                    Duration::from_secs(5),
                )
                .await
            {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        %user_id,
                        partition = partition,
                        offset = offset,
                        "Push notification published to Kafka"
                    );
                    Ok(())
                }
                Err((e, _)) => Err(AppError::Push(format!("Failed to publish to Kafka: {e}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMessage;

    fn message(message_type: MessageType, content: &str) -> Message {
        Message::new(NewMessage {
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            message_type,
            content: content.to_string(),
            audio_duration: None,
            reply_to: None,
            client_message_id: None,
        })
    }

    #[test]
    fn test_truncate_message_preview() {
        assert_eq!(truncate_message_preview("Hello", 100), "Hello");
        assert_eq!(truncate_message_preview("Hello world!", 8), "Hello...");
        assert_eq!(truncate_message_preview("你好你好你好", 5), "你好...");
    }

    #[test]
    fn test_body_depends_on_type() {
        let image = message_push_payload(None, &message(MessageType::Image, "https://x/y.png"));
        assert_eq!(image.body, "📷 Sent an image");

        let audio = message_push_payload(None, &message(MessageType::Audio, "https://x/y.webm"));
        assert_eq!(audio.body, "🎤 Sent a voice message");

        let sticker = message_push_payload(None, &message(MessageType::Sticker, "cat"));
        assert_eq!(sticker.body, "🎨 cat");

        let long = "a".repeat(150);
        let text = message_push_payload(None, &message(MessageType::Text, &long));
        assert_eq!(text.body.chars().count(), 100);
        assert!(text.body.ends_with("..."));
    }

    #[test]
    fn test_title_and_icon_come_from_sender() {
        let mut sender = UserProfile::new(Uuid::new_v4(), "Alice");
        let msg = message(MessageType::Text, "hi");

        let payload = message_push_payload(Some(&sender), &msg);
        assert_eq!(payload.title, "Alice");
        assert_eq!(payload.icon, DEFAULT_PUSH_ICON);
        assert_eq!(payload.data["type"], "message");
        assert_eq!(payload.data["messageId"], msg.id.to_string());

        sender.avatar_url = Some("https://cdn.example.com/alice.png".into());
        let payload = message_push_payload(Some(&sender), &msg);
        assert_eq!(payload.icon, "https://cdn.example.com/alice.png");
    }
}
