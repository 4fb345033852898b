//! UseCase: 接続ライフサイクル
//!
//! 1 本の接続の状態機械（`Connecting → Active → Closed`）を所有し、
//! 各遷移で Connection Registry と MessagePusher を更新します。
//! Registry の変更は変更フィード経由で Presence Broadcaster に届くため、
//! このユースケースは名簿の配信を直接行いません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - connect / disconnect / touch / sweep_stale
//!
//! ### なぜこのテストが必要か
//! - 明示的な切断とトランスポートの切断が同じ終端状態に収束すること
//! - 二重の切断通知でオンライン判定が狂わないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続、切断
//! - 異常系：接続数の上限超過
//! - エッジケース：二重切断、無通信の接続の掃除

use std::{collections::HashMap, sync::Arc, time::Duration};

use chatline_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{
    Connection, ConnectionId, ConnectionRegistry, DisconnectReason, MessagePusher, PushEvent,
    PusherChannel, RegistryError, Timestamp, UnregisterOutcome, UserId,
};

use super::error::ConnectError;

/// `disconnect` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// 接続を閉じた
    Closed { user_id: UserId, went_offline: bool },
    /// 既に閉じている、または未知の接続（何もしない）
    AlreadyClosed,
}

/// 接続ライフサイクルのユースケース
pub struct ConnectionLifecycleUseCase {
    registry: Arc<ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    /// 閉じていない接続
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ConnectionLifecycleUseCase {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            clock,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// 接続を開始し、Active にする
    ///
    /// 送信チャンネルは Registry への登録より先に MessagePusher へ渡す。
    /// これにより、この接続を含む最初の名簿もこの接続に届く。
    pub async fn connect(
        &self,
        user_id: UserId,
        channel: PusherChannel,
    ) -> Result<Connection, ConnectError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut connection = Connection::open(ConnectionId::generate(), user_id.clone(), now);
        let connection_id = connection.id;

        self.message_pusher
            .register_connection(connection_id, channel)
            .await;

        match self.registry.register(user_id.clone(), connection_id).await {
            Ok(outcome) => {
                tracing::debug!(
                    "Registry outcome for connection '{}': {:?}",
                    connection_id,
                    outcome
                );
            }
            Err(RegistryError::CapacityExceeded { user_id, limit }) => {
                self.message_pusher
                    .unregister_connection(&connection_id)
                    .await;
                tracing::warn!(
                    "Rejected connection for '{}': already holds {} connections",
                    user_id,
                    limit
                );
                return Err(ConnectError::TooManyConnections { user_id, limit });
            }
        }

        if let Err(e) = connection.activate() {
            // 生成直後の接続なので到達しない
            tracing::error!("Failed to activate connection '{}': {}", connection_id, e);
        }
        self.connections
            .lock()
            .await
            .insert(connection_id, connection.clone());
        tracing::info!("Connection '{}' for '{}' is active", connection_id, user_id);

        let connected = PushEvent::Connected {
            connection_id,
            user_id,
            connected_at: now,
        };
        if let Err(e) = self.message_pusher.push_to(&connection_id, &connected).await {
            tracing::warn!(
                "Failed to notify connection '{}' of activation: {}",
                connection_id,
                e
            );
        }

        Ok(connection)
    }

    /// 接続を閉じる
    ///
    /// 明示的な切断、トランスポートの切断、無通信による切断はすべてここに収束する。
    /// 2 回目以降の呼び出しは何もしない。
    pub async fn disconnect(
        &self,
        connection_id: &ConnectionId,
        reason: DisconnectReason,
    ) -> DisconnectOutcome {
        let Some(mut connection) = self.connections.lock().await.remove(connection_id) else {
            tracing::debug!(
                "Connection '{}' already closed, ignoring {:?}",
                connection_id,
                reason
            );
            return DisconnectOutcome::AlreadyClosed;
        };
        if let Err(e) = connection.close() {
            tracing::warn!("Connection '{}': {}", connection_id, e);
        }

        let outcome = match self.registry.unregister(connection_id).await {
            UnregisterOutcome::Unregistered {
                user_id,
                went_offline,
            } => DisconnectOutcome::Closed {
                user_id,
                went_offline,
            },
            UnregisterOutcome::UnknownConnection => {
                tracing::warn!(
                    "Connection '{}' was missing from the registry on disconnect",
                    connection_id
                );
                DisconnectOutcome::Closed {
                    user_id: connection.user_id.clone(),
                    went_offline: false,
                }
            }
        };
        self.message_pusher
            .unregister_connection(connection_id)
            .await;

        tracing::info!(
            "Connection '{}' for '{}' closed ({:?})",
            connection_id,
            connection.user_id,
            reason
        );
        outcome
    }

    /// 受信を記録する
    pub async fn touch(&self, connection_id: &ConnectionId) {
        let now = Timestamp::new(self.clock.now_millis());
        if let Some(connection) = self.connections.lock().await.get_mut(connection_id) {
            connection.touch(now);
        }
    }

    /// `max_idle` より長く無通信の接続をすべて閉じる
    pub async fn sweep_stale(&self, max_idle: Duration) -> Vec<ConnectionId> {
        let now = Timestamp::new(self.clock.now_millis());
        let max_idle_millis = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);

        let mut stale: Vec<ConnectionId> = self
            .connections
            .lock()
            .await
            .values()
            .filter(|connection| connection.is_stale(now, max_idle_millis))
            .map(|connection| connection.id)
            .collect();
        stale.sort();

        for connection_id in &stale {
            self.disconnect(connection_id, DisconnectReason::Stale)
                .await;
        }
        stale
    }

    /// 閉じていない接続を取得
    pub async fn connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.connections.lock().await.get(connection_id).cloned()
    }

    /// 閉じていない接続の数
    pub async fn open_connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// `interval` ごとに無通信の接続を掃除するタスクを起動
    pub fn spawn_stale_sweeper(
        self: Arc<Self>,
        interval: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 最初の tick は即座に完了する
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = self.sweep_stale(max_idle).await;
                if !swept.is_empty() {
                    tracing::info!("Swept {} stale connection(s)", swept.len());
                }
            }
        })
    }
}
