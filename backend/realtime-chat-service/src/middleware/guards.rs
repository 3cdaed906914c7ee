//! Request guards that resolve the caller before any handler logic runs

use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use super::auth::bearer_token;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, Error, FromRequest, HttpRequest};

/// Represents an authenticated user extracted from the bearer token
#[derive(Debug, Clone, Copy)]
pub struct User {
    pub id: Uuid,
}

impl FromRequest for User {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let state = state.ok_or(AppError::Internal)?;
            let token = token.ok_or(AppError::AuthRequired)?;
            let id = state.verifier.verify(&token)?;
            Ok(User { id })
        })
    }
}
