//! UseCase 層のエラー型

use thiserror::Error;

/// 接続処理のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("user '{user_id}' already holds {limit} connections")]
    TooManyConnections { user_id: String, limit: usize },
}

/// 会話解決のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveConversationError {
    #[error("a conversation needs two different members, got '{0}' twice")]
    SameMember(String),

    #[error("conversation unavailable: {0}")]
    ConversationUnavailable(String),
}

/// 会話一覧取得のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListConversationsError {
    #[error("conversation list unavailable: {0}")]
    Unavailable(String),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendMessageError {
    /// 自分自身には送れない
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// 会話を解決できなかった（何も保存されていない）
    #[error("conversation unavailable: {0}")]
    ConversationUnavailable(String),

    /// メッセージを保存できなかった（配信もされない）
    #[error("message persistence failed: {0}")]
    MessagePersistenceFailed(String),
}

/// メッセージ履歴取得のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GetMessageHistoryError {
    #[error("message history unavailable: {0}")]
    Unavailable(String),
}
