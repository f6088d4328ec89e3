//! Bearer-token authentication
//!
//! Callers present an HS256 JWT issued by the identity provider. The token
//! must carry the configured audience and an unexpired `exp`. Claims are
//! only checked, never forwarded into the pipeline.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{Result, ServerError};
use crate::state::AppState;

pub const DEFAULT_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: u64,
}

/// HS256 verifier with a fixed audience
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("key", &"<redacted>")
            .field("audience", &self.validation.aud)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(secret: &[u8], audience: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(ServerError::Internal("JWT secret must not be empty".into()));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Ok(Self {
            key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ServerError::Unauthorized(format!("invalid token: {e}")))
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Route layer rejecting requests without a valid bearer token
pub async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Result<Response> {
    let Some(verifier) = state.auth.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;

    let claims = verifier.verify(token)?;
    tracing::debug!(subject = claims.sub.as_deref().unwrap_or("-"), "request authenticated");

    Ok(next.run(req).await)
}
