use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};

/// JSON body returned for every failed REST request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
}

// map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => ("validation_error", "INVALID_REQUEST"),
        AppError::AuthRequired => ("authentication_error", "AUTH_REQUIRED"),
        AppError::Unauthorized => ("authorization_error", "NOT_MESSAGE_OWNER"),
        AppError::Forbidden => ("authorization_error", "AUTHORIZATION_ERROR"),
        AppError::NotFound(_) => ("not_found_error", "NOT_FOUND"),
        AppError::MessageDeleted => ("conflict_error", "MESSAGE_DELETED"),
        AppError::EditWindowExpired { .. } => ("authorization_error", "EDIT_WINDOW_EXPIRED"),
        AppError::Push(_) => ("server_error", "PUSH_ERROR"),
        AppError::Storage(_) => ("server_error", "STORAGE_ERROR"),
        AppError::Config(_) | AppError::Internal => ("server_error", "INTERNAL_SERVER_ERROR"),
    };

    let response = ErrorResponse {
        error: status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string(),
        message: err.client_message(),
        status: status.as_u16(),
        error_type: error_type.to_string(),
        code: code.to_string(),
    };

    (status, response)
}

pub fn into_response(err: AppError) -> HttpResponse {
    if err.is_retryable() {
        tracing::error!(error = %err, "request failed on collaborator");
    }
    let (status, response) = map_error(&err);
    HttpResponse::build(status).json(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_not_found() {
        let (status, body) = map_error(&AppError::NotFound("message"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.message, "Message not found");
    }

    #[test]
    fn test_map_error_storage_is_generic() {
        let (status, body) = map_error(&AppError::Storage("pool timed out".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_type, "server_error");
        assert!(!body.message.contains("pool"));
    }
}
