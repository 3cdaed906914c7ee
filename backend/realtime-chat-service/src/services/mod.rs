pub mod conversation_service;
pub mod message_service;
pub mod notification_producer;
pub mod presence_service;
pub mod send_pipeline;
pub mod typing_service;

pub use conversation_service::ConversationService;
pub use message_service::MessageService;
pub use notification_producer::{LogPushSender, PushPayload, PushSender};
pub use presence_service::PresenceService;
pub use send_pipeline::{SendMessageRequest, SendOutcome, SendPipeline};
pub use typing_service::TypingService;
