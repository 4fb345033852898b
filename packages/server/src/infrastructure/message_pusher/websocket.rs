//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続 ID ごとの `PusherChannel` を管理
//! - `PushEvent` を JSON フレームにエンコードして送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の受付とチャンネルの生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成されたチャンネルを受け取り、エンコード済みのフレームを流すだけです。
//! チャンネルを登録解除すると送信側が破棄され、UI 層の送信ループが終了します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, PushEvent, PusherChannel},
    infrastructure::dto::websocket::ServerEvent,
};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// ConnectionId -> 送信チャンネル
    channels: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録されているチャンネル数
    pub async fn channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    fn encode(event: &PushEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerEvent::from(event))
            .map_err(|e| MessagePushError::EncodeFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, channel: PusherChannel) {
        let mut channels = self.channels.lock().await;
        channels.insert(connection_id, channel);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut channels = self.channels.lock().await;
        if channels.remove(connection_id).is_some() {
            tracing::debug!(
                "Connection '{}' unregistered from MessagePusher",
                connection_id
            );
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &PushEvent,
    ) -> Result<(), MessagePushError> {
        let frame = Self::encode(event)?;
        let channels = self.channels.lock().await;

        let Some(channel) = channels.get(connection_id) else {
            return Err(MessagePushError::ConnectionNotFound(
                connection_id.to_string(),
            ));
        };
        channel
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed event to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &PushEvent,
    ) -> Result<usize, MessagePushError> {
        if targets.is_empty() {
            return Ok(0);
        }

        let frame = Self::encode(event)?;
        let channels = self.channels.lock().await;

        let mut delivered = 0;
        for target in targets {
            match channels.get(target) {
                Some(channel) => {
                    // 一部の送信失敗は許容
                    if let Err(e) = channel.send(frame.clone()) {
                        tracing::warn!("Failed to push event to connection '{}': {}", target, e);
                    } else {
                        delivered += 1;
                    }
                }
                None => {
                    tracing::warn!(
                        "Connection '{}' not found during broadcast, skipping",
                        target
                    );
                }
            }
        }

        Ok(delivered)
    }
}
