//! Error types for the offline queue.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Failures of the queue itself. Transport failures never surface here;
/// they leave the message queued instead.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Reading or writing the persisted queue failed
    #[error("Queue storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The persisted queue could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a message was not acknowledged by the send pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Not connected")]
    Disconnected,

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("No acknowledgment within {0:?}")]
    Timeout(Duration),
}
