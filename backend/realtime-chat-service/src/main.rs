use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use realtime_chat_service::{
    config::Config,
    logging, routes,
    services::{LogPushSender, PushSender},
    state::AppState,
    storage::{MemoryStore, Storage},
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = Config::from_env().context("loading configuration")?;

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &cfg.seed_users_path {
        store
            .load_users_from_file(path)
            .await
            .context("seeding user directory")?;
    }
    let storage = Storage::in_memory(store);
    let push = push_sender(&cfg)?;

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    let cors_origin = cfg.cors_allowed_origin.clone();
    let state = AppState::new(cfg, storage, push);

    tracing::info!(%bind_addr, "starting realtime-chat-service");

    // actix-web HttpServer futures are not Send, so the server runs in the foreground
    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => actix_cors::Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            None => actix_cors::Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::new("%r %s %Dms"))
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)
    .with_context(|| format!("bind REST on {bind_addr}"))?
    .run()
    .await
    .context("REST server")?;

    Ok(())
}

#[cfg(feature = "kafka")]
fn push_sender(cfg: &Config) -> anyhow::Result<Arc<dyn PushSender>> {
    use realtime_chat_service::services::notification_producer::KafkaPushSender;

    match &cfg.push.kafka_brokers {
        Some(brokers) => {
            let sender = KafkaPushSender::new(brokers, &cfg.push.topic)
                .context("creating Kafka push sender")?;
            Ok(Arc::new(sender))
        }
        None => Ok(Arc::new(LogPushSender)),
    }
}

#[cfg(not(feature = "kafka"))]
fn push_sender(cfg: &Config) -> anyhow::Result<Arc<dyn PushSender>> {
    if cfg.push.kafka_brokers.is_some() {
        tracing::warn!("KAFKA_BROKERS set but the kafka feature is disabled; push is log-only");
    }
    Ok(Arc::new(LogPushSender))
}
