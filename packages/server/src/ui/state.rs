//! Shared application state and dependency wiring.

use std::sync::Arc;

use chatline_shared::time::Clock;

use crate::{
    config::ServerConfig,
    domain::{ConnectionRegistry, MessagePusher, RosterFeed},
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConversationRepository, InMemoryMessageRepository},
    },
    usecase::{
        ConnectionLifecycleUseCase, GetMessageHistoryUseCase, ListConversationsUseCase,
        ResolveConversationUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Connection Registry（オンライン状態の唯一の情報源）
    pub registry: Arc<ConnectionRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub connection_lifecycle_usecase: Arc<ConnectionLifecycleUseCase>,
    pub resolve_conversation_usecase: Arc<ResolveConversationUseCase>,
    pub list_conversations_usecase: Arc<ListConversationsUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
}

impl AppState {
    /// 依存関係を組み立てる
    ///
    /// 1. Repository
    /// 2. MessagePusher
    /// 3. Connection Registry
    /// 4. UseCases
    ///
    /// Registry の変更フィードは呼び出し側が Presence Broadcaster に渡す。
    pub fn build(config: ServerConfig, clock: Arc<dyn Clock>) -> (Self, RosterFeed) {
        let persistence_timeout = config.persistence_timeout();

        // 1. Repository（インメモリ）
        let conversation_repository = Arc::new(InMemoryConversationRepository::new());
        let message_repository = Arc::new(InMemoryMessageRepository::new());

        // 2. MessagePusher
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        // 3. Connection Registry
        let (registry, feed) =
            ConnectionRegistry::with_connection_limit(config.connection_limit());
        let registry = Arc::new(registry);

        // 4. UseCases
        let connection_lifecycle_usecase = Arc::new(ConnectionLifecycleUseCase::new(
            registry.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));
        let resolve_conversation_usecase = Arc::new(ResolveConversationUseCase::new(
            conversation_repository.clone(),
            clock.clone(),
            persistence_timeout,
        ));
        let list_conversations_usecase = Arc::new(ListConversationsUseCase::new(
            conversation_repository,
            persistence_timeout,
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            resolve_conversation_usecase.clone(),
            message_repository.clone(),
            registry.clone(),
            message_pusher.clone(),
            clock,
            persistence_timeout,
        ));
        let get_message_history_usecase = Arc::new(GetMessageHistoryUseCase::new(
            message_repository,
            persistence_timeout,
        ));

        let state = Self {
            config,
            registry,
            message_pusher,
            connection_lifecycle_usecase,
            resolve_conversation_usecase,
            list_conversations_usecase,
            send_message_usecase,
            get_message_history_usecase,
        };
        (state, feed)
    }
}
