//! Client-side offline queue for chat messages
//!
//! Messages written while the connection is down are kept in order, persisted,
//! and replayed one at a time once connectivity returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use offline_queue::{
//!     FileQueueStore, MessageTransport, OfflineQueue, QueuedMessage, TransportError,
//! };
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! struct SocketTransport;
//!
//! #[async_trait::async_trait]
//! impl MessageTransport for SocketTransport {
//!     async fn send(&self, _message: &QueuedMessage) -> Result<(), TransportError> {
//!         // emit `sendMessage` with the client message id and wait for the ack
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileQueueStore::new("offline_message_queue.json"));
//!     let queue = OfflineQueue::open(store, Arc::new(SocketTransport), false).await?;
//!
//!     queue
//!         .send_or_enqueue(QueuedMessage::text(Uuid::new_v4(), "sent later"))
//!         .await?;
//!
//!     // connectivity came back: replay in order
//!     if let Some(report) = queue.set_online(true).await? {
//!         println!("sent {} queued messages", report.sent);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod message;
pub mod queue;
pub mod store;
pub mod transport;

pub use error::{QueueError, QueueResult, TransportError};
pub use message::{MessageKind, QueuedMessage};
pub use queue::{Delivery, FlushReport, OfflineQueue, QueueEvent};
pub use store::{FileQueueStore, MemoryQueueStore, QueueStore};
pub use transport::MessageTransport;
