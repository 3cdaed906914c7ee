use crate::{
    error::AppError, middleware::guards::User, models::ReactionGroup, state::AppState,
    websocket::message_types::ReactionAction,
};
use actix_web::{delete, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ReactionRequest {
    pub emoji: String, // Unicode emoji
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsResponse {
    pub message_id: Uuid,
    pub reactions: Vec<ReactionGroup>,
}

/// POST /messages/{id}/reactions
/// Add a reaction; adding the same emoji twice is a no-op
#[post("/messages/{id}/reactions")]
pub async fn add_reaction(
    state: web::Data<AppState>,
    message_id: web::Path<Uuid>,
    user: User,
    body: web::Json<ReactionRequest>,
) -> Result<HttpResponse, AppError> {
    let message_id = message_id.into_inner();
    let reactions = state
        .messages
        .react(message_id, user.id, &body.emoji, ReactionAction::Add)
        .await?;
    Ok(HttpResponse::Ok().json(ReactionsResponse {
        message_id,
        reactions,
    }))
}

/// DELETE /messages/{id}/reactions?emoji=
#[delete("/messages/{id}/reactions")]
pub async fn remove_reaction(
    state: web::Data<AppState>,
    message_id: web::Path<Uuid>,
    user: User,
    query: web::Query<ReactionRequest>,
) -> Result<HttpResponse, AppError> {
    let message_id = message_id.into_inner();
    let reactions = state
        .messages
        .react(message_id, user.id, &query.emoji, ReactionAction::Remove)
        .await?;
    Ok(HttpResponse::Ok().json(ReactionsResponse {
        message_id,
        reactions,
    }))
}
