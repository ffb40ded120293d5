//! Bearer-token identity verification. The verifier is a thin
//! collaborator that turns a token into a user identity; a missing or
//! invalid token aborts the request before any pipeline stage runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// Verified caller identity, injected as a request extension.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub struct AuthVerifier {
    secret: String,
}

impl AuthVerifier {
    pub fn from_env() -> Self {
        let secret = std::env::var("AGENT_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("AGENT_JWT_SECRET not set, using insecure development secret");
            "insecure-dev-secret".to_string()
        });
        Self { secret }
    }

    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(AuthUser {
            user_id: data.claims.sub,
        })
    }

    /// Mint a token for local tooling and tests.
    pub fn issue(
        &self,
        user_id: &str,
        ttl: std::time::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = chrono::Utc::now().timestamp() as usize + ttl.as_secs() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header missing".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;

    let user = state.auth.verify(token)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
