use crate::error::TransportError;
use crate::message::QueuedMessage;
use async_trait::async_trait;

/// Hands one message to the send pipeline.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Resolves once the server acknowledged the message. The implementation
    /// must send `message.client_message_id()` along with it.
    async fn send(&self, message: &QueuedMessage) -> Result<(), TransportError>;
}
