pub mod conversations;
pub mod messages;
pub mod reactions;
pub mod wsroute;

use actix_web::{get, web, HttpResponse};

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Mounts every HTTP and WebSocket endpoint.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .route("/metrics", web::get().to(crate::metrics::metrics_handler))
        .service(wsroute::ws_handler)
        .service(conversations::list_conversations)
        .service(conversations::create_conversation)
        .service(conversations::get_messages)
        .service(conversations::send_message)
        .service(conversations::set_mute)
        .service(conversations::mark_conversation_read)
        .service(conversations::online_users)
        .service(messages::edit_message)
        .service(messages::delete_message)
        .service(messages::mark_read)
        .service(reactions::add_reaction)
        .service(reactions::remove_reaction);
}
