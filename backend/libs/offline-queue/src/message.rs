use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
    Gif,
    Sticker,
}

/// Outbound message waiting for connectivity.
///
/// `local_id` is sent as the `clientMessageId`, so a replay of a message the
/// server already accepted is recognised there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    pub local_id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl QueuedMessage {
    pub fn new(conversation_id: Uuid, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            conversation_id,
            content: content.into(),
            kind,
            audio_duration: None,
            created_at: Utc::now(),
        }
    }

    pub fn text(conversation_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content, MessageKind::Text)
    }

    /// Voice messages carry their length in seconds.
    pub fn with_audio_duration(mut self, seconds: f64) -> Self {
        if self.kind == MessageKind::Audio {
            self.audio_duration = Some(seconds);
        }
        self
    }

    pub fn client_message_id(&self) -> String {
        self.local_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let message = QueuedMessage::new(Uuid::new_v4(), "https://cdn/v.webm", MessageKind::Audio)
            .with_audio_duration(3.5);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "audio");
        assert_eq!(value["audioDuration"], 3.5);
        assert_eq!(value["localId"], message.local_id.to_string());
        assert!(value.get("conversationId").is_some());
    }

    #[test]
    fn test_audio_duration_only_for_audio() {
        let message = QueuedMessage::text(Uuid::new_v4(), "hi").with_audio_duration(2.0);
        assert!(message.audio_duration.is_none());
    }
}
