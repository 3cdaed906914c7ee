use crate::{
    error::AppError,
    middleware::guards::User,
    models::{Message, MessageType},
    services::SendMessageRequest,
    state::AppState,
};
use actix_web::{get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub page: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub reply_to: Option<Uuid>,
    pub audio_duration: Option<f64>,
    pub client_message_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MuteRequest {
    pub mute: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub marked_read: usize,
}

/// GET /conversations
/// Conversations of the caller, most recent activity first
#[get("/conversations")]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let conversations = state.conversations.list_for(user.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// POST /conversations
/// Returns the conversation with a friend, creating it on first use
#[post("/conversations")]
pub async fn create_conversation(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation = state
        .conversations
        .find_or_create(user.id, body.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(conversation))
}

/// GET /conversations/{id}/messages?page=&limit=
#[get("/conversations/{id}/messages")]
pub async fn get_messages(
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    user: User,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .conversations
        .history(conversation_id.into_inner(), user.id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(HistoryResponse {
        messages,
        page: query.page.unwrap_or(1).max(1),
    }))
}

/// POST /conversations/{id}/messages
/// Same pipeline as the live `sendMessage` event
#[post("/conversations/{id}/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    user: User,
    body: web::Json<SendMessageBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let outcome = state
        .pipeline
        .send(SendMessageRequest {
            conversation_id: conversation_id.into_inner(),
            sender_id: user.id,
            content: body.content,
            message_type: body.message_type,
            reply_to: body.reply_to,
            audio_duration: body.audio_duration,
            client_message_id: body.client_message_id,
        })
        .await?;

    if outcome.duplicate {
        Ok(HttpResponse::Ok().json(outcome.message))
    } else {
        Ok(HttpResponse::Created().json(outcome.message))
    }
}

/// PUT /conversations/{id}/mute
#[put("/conversations/{id}/mute")]
pub async fn set_mute(
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    user: User,
    body: web::Json<MuteRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation = state
        .conversations
        .set_muted(conversation_id.into_inner(), user.id, body.mute)
        .await?;
    Ok(HttpResponse::Ok().json(conversation))
}

/// POST /conversations/{id}/read
#[post("/conversations/{id}/read")]
pub async fn mark_conversation_read(
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let marked_read = state
        .messages
        .mark_conversation_read(conversation_id.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { marked_read }))
}

/// GET /online-users
#[get("/online-users")]
pub async fn online_users(state: web::Data<AppState>, _user: User) -> HttpResponse {
    let user_ids = state.presence.online_users().await;
    HttpResponse::Ok().json(serde_json::json!({ "userIds": user_ids }))
}
