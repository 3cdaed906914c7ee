//! Shared harness for integration tests
//!
//! Builds an `AppState` over the in-memory store with a recording push sender and
//! lets tests attach fake connections whose outbound events can be inspected.

#![allow(dead_code)]

use async_trait::async_trait;
use realtime_chat_service::{
    config::Config,
    error::{AppError, AppResult},
    models::{Conversation, MessageType, UserProfile},
    services::{PushPayload, PushSender, SendMessageRequest, SendOutcome},
    state::AppState,
    storage::{MemoryStore, Storage},
    websocket::ConnectionHandle,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Push sender that records every call instead of delivering it
#[derive(Clone, Default)]
pub struct RecordingPushSender {
    calls: Arc<Mutex<Vec<(Uuid, PushPayload)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPushSender {
    pub fn calls(&self) -> Vec<(Uuid, PushPayload)> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following push fail after being recorded
    pub fn fail_with_error(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send_push(&self, user_id: Uuid, payload: PushPayload) -> AppResult<()> {
        self.calls.lock().unwrap().push((user_id, payload));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Push("push backend unavailable".into()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub push: RecordingPushSender,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::test_defaults())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let push = RecordingPushSender::default();
        let storage = Storage::in_memory(store.clone());
        let state = AppState::new(config, storage, Arc::new(push.clone()));
        Self { state, store, push }
    }

    pub async fn user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_user(UserProfile::new(id, name)).await;
        id
    }

    /// Two friends and their conversation
    pub async fn friends_with_conversation(&self) -> (Uuid, Uuid, Conversation) {
        let alice = self.user("Alice").await;
        let bob = self.user("Bob").await;
        self.store.add_friendship(alice, bob).await;
        let conversation = self
            .state
            .conversations
            .find_or_create(alice, bob)
            .await
            .unwrap();
        (alice, bob, conversation)
    }

    /// Registers a fake live connection for `user` the way a session worker does
    pub async fn connect(&self, user: Uuid) -> TestClient {
        let (handle, rx) = ConnectionHandle::new(user);
        self.state.presence.connect(handle.clone()).await.unwrap();
        TestClient { handle, rx }
    }

    pub async fn disconnect(&self, client: &TestClient) -> bool {
        self.state
            .presence
            .disconnect(client.handle.user_id, client.handle.id)
            .await
            .unwrap()
    }

    pub async fn send_text(
        &self,
        conversation: &Conversation,
        sender: Uuid,
        content: &str,
    ) -> AppResult<SendOutcome> {
        self.send(conversation, sender, MessageType::Text, content).await
    }

    pub async fn send(
        &self,
        conversation: &Conversation,
        sender: Uuid,
        message_type: MessageType,
        content: &str,
    ) -> AppResult<SendOutcome> {
        self.state
            .pipeline
            .send(SendMessageRequest {
                conversation_id: conversation.id,
                sender_id: sender,
                content: content.to_string(),
                message_type,
                reply_to: None,
                audio_duration: None,
                client_message_id: None,
            })
            .await
    }
}

/// Fake connection; events routed to it are queued on `rx`
pub struct TestClient {
    pub handle: ConnectionHandle,
    pub rx: UnboundedReceiver<String>,
}

impl TestClient {
    /// Every event queued so far, parsed
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(raw) = self.rx.try_recv() {
            events.push(serde_json::from_str(&raw).unwrap());
        }
        events
    }
}

pub fn named<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["event"] == name).collect()
}
