//! Conversion logic from domain entities to DTOs.

use chatline_shared::time::timestamp_to_rfc3339;

use crate::domain::{Conversation, ConversationSummary, Message, PresenceRoster, PushEvent};
use crate::infrastructure::dto::{http, websocket::ServerEvent};

// ========================================
// Domain Entity → WebSocket DTO
// ========================================

impl From<&PushEvent> for ServerEvent {
    fn from(event: &PushEvent) -> Self {
        match event {
            PushEvent::Connected {
                connection_id,
                user_id,
                connected_at,
            } => ServerEvent::Connected {
                connection_id: connection_id.to_string(),
                user_id: user_id.to_string(),
                connected_at: connected_at.value(),
            },
            PushEvent::RosterUpdate(roster) => ServerEvent::RosterUpdate {
                version: roster.version,
                online_user_ids: online_user_ids(roster),
            },
            PushEvent::MessageDelivered(message) => ServerEvent::MessageDelivered {
                conversation_id: message.conversation_id.to_string(),
                sender_id: message.sender_id.to_string(),
                body: message.body.as_str().to_string(),
                sent_at: message.sent_at.value(),
            },
            PushEvent::MessageSent {
                conversation_id,
                recipient_id,
                sent_at,
                delivered_connections,
            } => ServerEvent::MessageSent {
                conversation_id: conversation_id.to_string(),
                recipient_id: recipient_id.to_string(),
                sent_at: sent_at.value(),
                delivered_connections: *delivered_connections,
            },
            PushEvent::SendFailed {
                recipient_id,
                reason,
            } => ServerEvent::SendFailed {
                recipient_id: recipient_id.clone(),
                reason: reason.clone(),
            },
            PushEvent::Error { reason } => ServerEvent::Error {
                reason: reason.clone(),
            },
        }
    }
}

// ========================================
// Domain Entity → HTTP DTO
// ========================================

impl From<Conversation> for http::ConversationDto {
    fn from(conversation: Conversation) -> Self {
        Self {
            conversation_id: conversation.id.to_string(),
            members: vec![
                conversation.members.first().to_string(),
                conversation.members.second().to_string(),
            ],
            created_at: timestamp_to_rfc3339(conversation.created_at.value()),
        }
    }
}

impl From<ConversationSummary> for http::ConversationSummaryDto {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            conversation_id: summary.conversation_id.to_string(),
            partner_id: summary.partner_id.into_string(),
            matched_at: timestamp_to_rfc3339(summary.matched_at.value()),
        }
    }
}

impl From<Message> for http::MessageDto {
    fn from(message: Message) -> Self {
        Self {
            conversation_id: message.conversation_id.to_string(),
            sender_id: message.sender_id.into_string(),
            body: message.body.into_string(),
            sent_at: message.sent_at.value(),
        }
    }
}

impl From<PresenceRoster> for http::PresenceDto {
    fn from(roster: PresenceRoster) -> Self {
        Self {
            version: roster.version,
            online_user_ids: online_user_ids(&roster),
        }
    }
}

fn online_user_ids(roster: &PresenceRoster) -> Vec<String> {
    roster
        .online_user_ids
        .iter()
        .map(ToString::to_string)
        .collect()
}
