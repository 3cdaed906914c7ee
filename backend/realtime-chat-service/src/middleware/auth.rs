use crate::error::AppError;
use actix_web::{http::header, HttpRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "userId")]
    pub sub: String, // subject - the user_id
    pub exp: i64,    // expiration time (unix timestamp)
}

/// HS256 verifier for the identity tokens issued by the auth collaborator.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding: Arc<DecodingKey>,
    encoding: Arc<EncodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validates signature and expiry and returns the user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::AuthRequired
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::AuthRequired)
    }

    /// Signs a token for `user_id`; used by tests and local tooling.
    pub fn issue(&self, user_id: Uuid, ttl: chrono::Duration) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Config(format!("cannot sign token: {e}")))
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
