use crate::middleware::error_handling;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self.clone())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Handshake or request without a valid identity token.
    #[error("authentication required")]
    AuthRequired,

    /// Caller is authenticated but does not own the target (edit/delete by a non-sender).
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("message was deleted for everyone")]
    MessageDeleted,

    #[error("edit window expired (max_edit_minutes: {max_edit_minutes})")]
    EditWindowExpired { max_edit_minutes: i64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("push notification error: {0}")]
    Push(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Storage and push failures are transient collaborator failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::Push(_) | AppError::Internal)
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::AuthRequired => 401,
            AppError::Unauthorized | AppError::Forbidden => 403,
            AppError::EditWindowExpired { .. } => 403,
            AppError::NotFound(_) => 404,
            AppError::MessageDeleted => 410,
            AppError::Push(_) => 502,
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal => 500,
        }
    }

    /// Text safe to show to a connected client. Collaborator failures never leak detail.
    pub fn client_message(&self) -> String {
        match self {
            AppError::BadRequest(reason) => reason.clone(),
            AppError::AuthRequired => "Authentication required".to_string(),
            AppError::Unauthorized => "You can only change your own messages".to_string(),
            AppError::Forbidden => "Not allowed".to_string(),
            AppError::NotFound("conversation") => "Conversation not found".to_string(),
            AppError::NotFound("message") => "Message not found".to_string(),
            AppError::NotFound(_) => "Not found".to_string(),
            AppError::MessageDeleted => "Message was deleted".to_string(),
            AppError::EditWindowExpired { max_edit_minutes } => {
                format!("Can only edit messages within {max_edit_minutes} minutes")
            }
            AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Push(_)
            | AppError::Internal => "Something went wrong".to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::BadRequest(format!("invalid payload: {e}"))
    }
}
