use crate::{
    config::Config,
    middleware::JwtVerifier,
    services::{
        ConversationService, MessageService, PresenceService, PushSender, SendPipeline,
        TypingService,
    },
    storage::Storage,
    websocket::{ConnectionRegistry, EventRouter},
};
use std::sync::Arc;

/// Shared handles cloned into every request and connection worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: ConnectionRegistry,
    pub router: EventRouter,
    pub storage: Storage,
    pub verifier: JwtVerifier,
    pub messages: MessageService,
    pub pipeline: SendPipeline,
    pub presence: PresenceService,
    pub typing: TypingService,
    pub conversations: ConversationService,
}

impl AppState {
    pub fn new(config: Config, storage: Storage, push: Arc<dyn PushSender>) -> Self {
        let registry = ConnectionRegistry::new();
        let router = EventRouter::new(registry.clone());
        let verifier = JwtVerifier::new(&config.jwt_secret);

        let messages = MessageService::new(
            storage.conversations.clone(),
            storage.messages.clone(),
            router.clone(),
            config.edit_window(),
        );
        let pipeline = SendPipeline::new(storage.clone(), router.clone(), messages.clone(), push);
        let presence = PresenceService::new(
            storage.users.clone(),
            router.clone(),
            messages.clone(),
            config.deliver_pending_on_connect,
        );
        let typing = TypingService::new(messages.clone(), router.clone());
        let conversations = ConversationService::new(storage.clone(), messages.clone());

        Self {
            config: Arc::new(config),
            registry,
            router,
            storage,
            verifier,
            messages,
            pipeline,
            presence,
            typing,
            conversations,
        }
    }
}
