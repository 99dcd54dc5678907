//! Conversation and message handlers.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::server::AppState;
use crate::server::auth::AuthUser;
use crate::server::types::{
    ApiError, ConversationResponse, ConversationSummaryResponse, MessageListResponse,
    MessageResponse, MessagesQuery,
};

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ConversationResponse>), ApiError> {
    let conversation = state.store.create_conversation(&user_id, None).await?;
    Ok((StatusCode::CREATED, Json(conversation.into())))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<ConversationSummaryResponse>>, ApiError> {
    let summaries = state.store.list_conversation_summaries(&user_id).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(ConversationSummaryResponse::from)
            .collect(),
    ))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessageListResponse>, ApiError> {
    // Ownership gate first: a foreign conversation id must not leak
    // whether it exists.
    state
        .store
        .get_conversation(id, &user_id)
        .await?
        .ok_or(ApiError::NotFound("conversation not found"))?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let (messages, has_more) = state
        .store
        .list_messages_paginated(id, query.before, limit)
        .await?;

    Ok(Json(MessageListResponse {
        messages: messages.into_iter().map(MessageResponse::from).collect(),
        has_more,
    }))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_conversation(id, &user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("conversation not found"))
    }
}
