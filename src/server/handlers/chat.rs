//! Chat endpoint and session token handlers.

use axum::extract::{Extension, State};
use axum::Json;

use crate::server::AppState;
use crate::server::auth::AuthUser;
use crate::server::rate_limit::RateLimitResult;
use crate::server::types::{ApiError, ChatRequest, ChatResponse, SessionResponse};

/// Longest accepted chat message, matching the task description bound
/// plus headroom for conversational text.
const MAX_MESSAGE_LEN: usize = 4000;

pub async fn chat(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    if let RateLimitResult::Limited {
        retry_after,
        limit_type,
    } = state.rate_limiter.check_and_record(&user_id).await
    {
        tracing::warn!(%limit_type, "Chat request rate limited");
        return Err(ApiError::RateLimited {
            retry_after_secs: retry_after.as_secs().max(1),
        });
    }

    let reply = state
        .chat
        .send_message(&user_id, body.conversation_id, message)
        .await?;

    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id,
        response: reply.content,
        tool_calls: reply.tool_calls,
        model: reply.model,
    }))
}

/// Issue a short-lived chat session token for the authenticated user.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Json<SessionResponse> {
    state.sessions.purge_expired().await;
    let (client_secret, expires_at) = state.sessions.issue(&user_id).await;
    Json(SessionResponse {
        client_secret,
        expires_at,
    })
}
