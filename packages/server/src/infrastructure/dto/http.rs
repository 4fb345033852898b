//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// Request body of `POST /api/conversations`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConversationRequest {
    pub member_a: String,
    pub member_b: String,
}

/// A conversation between two members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub conversation_id: String,
    pub members: Vec<String>,
    /// RFC 3339
    pub created_at: String,
}

/// One row of a user's conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryDto {
    pub conversation_id: String,
    pub partner_id: String,
    /// RFC 3339, the conversation's creation time
    pub matched_at: String,
}

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    /// Unix timestamp in milliseconds
    pub sent_at: i64,
}

/// Current online roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub version: u64,
    pub online_user_ids: Vec<String>,
}
