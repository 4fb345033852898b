//! UseCase 層
//!
//! ドメイン層の Registry / Repository / MessagePusher を組み合わせて、
//! 接続のライフサイクル、在室状況の配信、会話の解決、メッセージの送信を実装します。

pub mod broadcast_presence;
pub mod connection_lifecycle;
pub mod error;
pub mod get_message_history;
pub mod list_conversations;
mod persistence;
pub mod resolve_conversation;
pub mod send_message;

pub use broadcast_presence::PresenceBroadcaster;
pub use connection_lifecycle::{ConnectionLifecycleUseCase, DisconnectOutcome};
pub use error::{
    ConnectError, GetMessageHistoryError, ListConversationsError, ResolveConversationError,
    SendMessageError,
};
pub use get_message_history::GetMessageHistoryUseCase;
pub use list_conversations::ListConversationsUseCase;
pub use resolve_conversation::ResolveConversationUseCase;
pub use send_message::{SendMessageUseCase, SendReceipt};
