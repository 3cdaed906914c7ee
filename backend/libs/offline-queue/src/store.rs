//! Persistence for queued messages.

use crate::error::QueueResult;
use crate::message::QueuedMessage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable home of the queue. The whole queue is rewritten on every mutation.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Messages in their original order; an absent store is an empty queue.
    async fn load(&self) -> QueueResult<Vec<QueuedMessage>>;

    async fn save(&self, messages: &[QueuedMessage]) -> QueueResult<()>;
}

/// JSON file store. Writes go to a sibling temp file which is then renamed over
/// the target, so a crash mid-write never leaves a truncated queue behind.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    path: PathBuf,
}

impl FileQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn load(&self) -> QueueResult<Vec<QueuedMessage>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, messages: &[QueuedMessage]) -> QueueResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec(messages)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// Non-durable store, for tests and for clients without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    messages: Mutex<Vec<QueuedMessage>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<QueuedMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> QueueResult<Vec<QueuedMessage>> {
        Ok(self.messages.lock().await.clone())
    }

    async fn save(&self, messages: &[QueuedMessage]) -> QueueResult<()> {
        *self.messages.lock().await = messages.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_missing_file_is_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueueStore::new(dir.path().join("queue.json"));

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueueStore::new(dir.path().join("nested").join("queue.json"));
        let conversation = Uuid::new_v4();
        let messages = vec![
            QueuedMessage::text(conversation, "first"),
            QueuedMessage::text(conversation, "second"),
        ];

        store.save(&messages).await.unwrap();
        store.save(&messages[1..]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, messages[1..].to_vec());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileQueueStore::new(path);
        assert!(store.load().await.is_err());
    }
}
