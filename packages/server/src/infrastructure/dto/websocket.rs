//! WebSocket message DTOs.
//!
//! Every frame is a JSON object with a `type` tag. The set of variants is
//! closed: anything that does not decode into one of them is rejected at the
//! transport boundary before it reaches the usecases.

use serde::{Deserialize, Serialize};

/// Events accepted from clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Identify the connection when the upgrade carried no `user_id`.
    Connect { user_id: String },
    /// Explicit disconnect (e.g. sent from a window-unload hook).
    Disconnect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection_id: Option<String>,
    },
    /// Send a message to another user.
    SendMessage { recipient_id: String, body: String },
}

/// Events pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Connected {
        connection_id: String,
        user_id: String,
        connected_at: i64,
    },
    RosterUpdate {
        version: u64,
        online_user_ids: Vec<String>,
    },
    MessageDelivered {
        conversation_id: String,
        sender_id: String,
        body: String,
        sent_at: i64,
    },
    MessageSent {
        conversation_id: String,
        recipient_id: String,
        sent_at: i64,
        delivered_connections: usize,
    },
    SendFailed {
        recipient_id: String,
        reason: String,
    },
    Error {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_send_message() {
        // テスト項目: send-message イベントをデコードできる
        // given (前提条件):
        let json = r#"{"type":"send-message","recipientId":"bob","body":"hi"}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                recipient_id: "bob".to_string(),
                body: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_disconnect_without_connection_id() {
        // テスト項目: connectionId を省略した disconnect もデコードできる
        // given (前提条件):
        let json = r#"{"type":"disconnect"}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(event, ClientEvent::Disconnect { connection_id: None });
    }

    #[test]
    fn test_decode_rejects_unknown_type_and_missing_fields() {
        // テスト項目: 未知の type やフィールド不足は拒否される
        // given (前提条件):
        let unknown = r#"{"type":"new-user-add","userId":"alice"}"#;
        let missing = r#"{"type":"send-message","body":"hi"}"#;
        let untagged = r#"{"recipientId":"bob","body":"hi"}"#;

        // when (操作):

        // then (期待する結果):
        assert!(serde_json::from_str::<ClientEvent>(unknown).is_err());
        assert!(serde_json::from_str::<ClientEvent>(missing).is_err());
        assert!(serde_json::from_str::<ClientEvent>(untagged).is_err());
    }

    #[test]
    fn test_encode_message_delivered_uses_camel_case() {
        // テスト項目: message-delivered がタグ付き・camelCase でエンコードされる
        // given (前提条件):
        let event = ServerEvent::MessageDelivered {
            conversation_id: "c1".to_string(),
            sender_id: "alice".to_string(),
            body: "hi".to_string(),
            sent_at: 1000,
        };

        // when (操作):
        let value = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            serde_json::json!({
                "type": "message-delivered",
                "conversationId": "c1",
                "senderId": "alice",
                "body": "hi",
                "sentAt": 1000,
            })
        );
    }

    #[test]
    fn test_encode_roster_update() {
        // テスト項目: roster-update が onlineUserIds を含む
        // given (前提条件):
        let event = ServerEvent::RosterUpdate {
            version: 2,
            online_user_ids: vec!["alice".to_string(), "bob".to_string()],
        };

        // when (操作):
        let json = serde_json::to_string(&event).unwrap();

        // then (期待する結果):
        assert!(json.contains(r#""type":"roster-update""#));
        assert!(json.contains(r#""onlineUserIds":["alice","bob"]"#));
    }
}
