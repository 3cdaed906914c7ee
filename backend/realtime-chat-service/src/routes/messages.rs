use crate::{error::AppError, middleware::guards::User, state::AppState};
use actix_web::{delete, post, put, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub for_everyone: bool,
}

/// PUT /messages/{id}
/// Edit own text message
#[put("/messages/{id}")]
pub async fn edit_message(
    state: web::Data<AppState>,
    message_id: web::Path<Uuid>,
    user: User,
    body: web::Json<EditMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .messages
        .edit_message(message_id.into_inner(), user.id, body.into_inner().content)
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

/// DELETE /messages/{id}
/// Body is optional; without it the message is deleted for the caller only
#[delete("/messages/{id}")]
pub async fn delete_message(
    state: web::Data<AppState>,
    message_id: web::Path<Uuid>,
    user: User,
    body: Option<web::Json<DeleteMessageRequest>>,
) -> Result<HttpResponse, AppError> {
    let for_everyone = body.map(|b| b.for_everyone).unwrap_or(false);
    let message = state
        .messages
        .delete_message(message_id.into_inner(), user.id, for_everyone)
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

/// POST /messages/{id}/read
#[post("/messages/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    message_id: web::Path<Uuid>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let changed = state
        .messages
        .mark_read(message_id.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "changed": changed })))
}
