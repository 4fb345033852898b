//! UseCase: メッセージ送信処理
//!
//! 1. 会話を解決する
//! 2. サーバーの時刻でメッセージを作る
//! 3. メッセージを保存する（配信より必ず先）
//! 4. 受信者の生きた接続を Registry から引き、全接続へ同じイベントを配信する
//!
//! 受信者がオフラインなら配信は行わず、保存されたメッセージが履歴に残ります。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 保存に失敗したメッセージが配信されないことを保証する
//! - 複数タブの受信者に同じイベントが届くことを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：オンラインの受信者への送信、オフラインの受信者への送信
//! - 異常系：自分宛て、会話の解決失敗、保存失敗、保存の時間切れ
//! - エッジケース：受信者が 2 本の接続を持つ場合

use std::{sync::Arc, time::Duration};

use chatline_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, Message, MessageBody, MessagePusher, MessageRepository, PushEvent,
    Timestamp, UserId,
};

use super::{
    error::SendMessageError, persistence::bounded,
    resolve_conversation::ResolveConversationUseCase,
};

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message: Message,
    pub recipient_id: UserId,
    /// 配信できた受信者の接続数（オフラインなら 0）
    pub delivered_connections: usize,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    resolver: Arc<ResolveConversationUseCase>,
    message_repository: Arc<dyn MessageRepository>,
    registry: Arc<ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    persistence_timeout: Duration,
}

impl SendMessageUseCase {
    pub fn new(
        resolver: Arc<ResolveConversationUseCase>,
        message_repository: Arc<dyn MessageRepository>,
        registry: Arc<ConnectionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        persistence_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            message_repository,
            registry,
            message_pusher,
            clock,
            persistence_timeout,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(SendReceipt)` - 保存済み（配信は受信者がオンラインの場合のみ）
    /// * `Err(SendMessageError)` - 何も配信されていない
    pub async fn execute(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        body: MessageBody,
    ) -> Result<SendReceipt, SendMessageError> {
        if sender_id == recipient_id {
            return Err(SendMessageError::InvalidRecipient(
                recipient_id.into_string(),
            ));
        }

        // 1. 会話の解決
        let conversation = self
            .resolver
            .execute(sender_id.clone(), recipient_id.clone())
            .await
            .map_err(|e| SendMessageError::ConversationUnavailable(e.to_string()))?;

        // 2. メッセージの作成
        let sent_at = Timestamp::new(self.clock.now_millis());
        let message = Message::new(conversation.id, sender_id, body, sent_at);

        // 3. 保存
        bounded(
            self.persistence_timeout,
            self.message_repository.save_message(&message),
        )
        .await
        .map_err(|e| SendMessageError::MessagePersistenceFailed(e.to_string()))?;

        // 4. 配信
        let targets = self.registry.connections_for(&recipient_id).await;
        let delivered_connections = if targets.is_empty() {
            tracing::debug!(
                "Recipient '{}' is offline, message kept in conversation '{}'",
                recipient_id,
                conversation.id
            );
            0
        } else {
            let event = PushEvent::MessageDelivered(message.clone());
            match self.message_pusher.broadcast(&targets, &event).await {
                Ok(delivered) => delivered,
                Err(e) => {
                    tracing::warn!("Failed to deliver message to '{}': {}", recipient_id, e);
                    0
                }
            }
        };

        Ok(SendReceipt {
            message,
            recipient_id,
            delivered_connections,
        })
    }
}
