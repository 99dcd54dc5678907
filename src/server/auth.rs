//! Bearer-JWT authentication for the `/api` routes.
//!
//! Tokens are HS256-signed with the shared secret from `AuthConfig`;
//! `sub` carries the user id and `exp` is enforced. The middleware
//! resolves the token and stores an [`AuthUser`] extension for handlers.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::history::validate_user_id;
use crate::server::AppState;
use crate::server::types::ApiError;

/// JWT claims accepted by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued for.
    pub sub: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Axum middleware validating `Authorization: Bearer <jwt>`.
///
/// Wire up with `axum::middleware::from_fn_with_state(state, auth_middleware)`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let user_id = decode_user_id(token, state.auth.jwt_secret.expose_secret())
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

/// Decode and validate a token, returning its subject.
fn decode_user_id(token: &str, secret: &str) -> Option<String> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })
        .ok()?;

    // A structurally valid token with an out-of-bounds subject is still
    // unusable; reject it here rather than deep in the store.
    validate_user_id(&data.claims.sub).ok()?;
    Some(data.claims.sub)
}

#[cfg(test)]
pub(crate) fn mint_token(user_id: &str, secret: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
