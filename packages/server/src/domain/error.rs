//! Domain error types.

use thiserror::Error;

use super::entity::ConnectionState;

/// Value Object の生成時エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id must be at most {0} characters")]
    UserIdTooLong(usize),

    #[error("user id '{0}' contains whitespace or control characters")]
    UserIdInvalidCharacter(String),

    #[error("invalid conversation id: '{0}'")]
    InvalidConversationId(String),

    #[error("message body must not be empty")]
    MessageBodyEmpty,

    #[error("message body must be at most {0} characters")]
    MessageBodyTooLong(usize),

    #[error("a conversation needs two different members, got '{0}' twice")]
    SameMember(String),
}

/// 永続化ストアのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// ストアに到達できない、またはタイムアウトした
    #[error("persistence store unavailable: {0}")]
    Unavailable(String),

    /// 書き込みが拒否された
    #[error("persistence write rejected: {0}")]
    WriteRejected(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("connection '{0}' is not attached to the pusher")]
    ConnectionNotFound(String),

    #[error("failed to push to connection: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    EncodeFailed(String),
}

/// 接続ライフサイクルの状態遷移エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid connection state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// Connection Registry のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("user '{user_id}' already holds {limit} connections")]
    CapacityExceeded { user_id: String, limit: usize },
}
