//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{ConversationId, UserId},
    infrastructure::dto::http::{
        ConversationDto, ConversationSummaryDto, MessageDto, PresenceDto,
        ResolveConversationRequest,
    },
    ui::state::AppState,
    usecase::{
        GetMessageHistoryError, ListConversationsError, ResolveConversationError,
    },
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current online roster
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<PresenceDto> {
    let roster = state.registry.snapshot().await;
    Json(roster.into())
}

/// Find or create the conversation between two members
pub async fn resolve_conversation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResolveConversationRequest>,
) -> Result<Json<ConversationDto>, StatusCode> {
    let (member_a, member_b) = match (
        UserId::try_from(request.member_a),
        UserId::try_from(request.member_b),
    ) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Invalid member in conversation request: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    match state
        .resolve_conversation_usecase
        .execute(member_a, member_b)
        .await
    {
        Ok(conversation) => Ok(Json(conversation.into())),
        Err(ResolveConversationError::SameMember(id)) => {
            tracing::warn!("Rejected conversation of '{}' with themselves", id);
            Err(StatusCode::BAD_REQUEST)
        }
        Err(ResolveConversationError::ConversationUnavailable(reason)) => {
            tracing::warn!("Failed to resolve conversation: {}", reason);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Conversations of a user, newest matched first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummaryDto>>, StatusCode> {
    let user_id = UserId::try_from(user_id).map_err(|e| {
        tracing::warn!("Invalid user_id: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    match state.list_conversations_usecase.execute(&user_id).await {
        Ok(summaries) => Ok(Json(summaries.into_iter().map(Into::into).collect())),
        Err(ListConversationsError::Unavailable(reason)) => {
            tracing::warn!("Failed to list conversations of '{}': {}", user_id, reason);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Message history of a conversation, oldest first
pub async fn get_message_history(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let conversation_id = ConversationId::parse(&conversation_id).map_err(|e| {
        tracing::warn!("{}", e);
        StatusCode::BAD_REQUEST
    })?;

    match state
        .get_message_history_usecase
        .execute(&conversation_id)
        .await
    {
        Ok(messages) => Ok(Json(messages.into_iter().map(Into::into).collect())),
        Err(GetMessageHistoryError::Unavailable(reason)) => {
            tracing::warn!(
                "Failed to load history of conversation '{}': {}",
                conversation_id,
                reason
            );
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
