//! MessagePusher trait 定義
//!
//! 接続中のクライアントへイベントを届けるためのインターフェース。
//! ドメイン層はイベントの「意味」だけを扱い、ワイヤー形式への変換は
//! Infrastructure 層の実装が担当します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, ConversationId, Message, MessagePushError, PresenceRoster, Timestamp, UserId};

/// 1 接続あたりの送信チャンネル（エンコード済みのフレームを運ぶ）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// クライアントへ送るイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// 接続が Active になった
    Connected {
        connection_id: ConnectionId,
        user_id: UserId,
        connected_at: Timestamp,
    },
    /// オンライン名簿の更新
    RosterUpdate(PresenceRoster),
    /// 受信者へのメッセージ配信
    MessageDelivered(Message),
    /// 送信者への送信完了通知
    MessageSent {
        conversation_id: ConversationId,
        recipient_id: UserId,
        sent_at: Timestamp,
        delivered_connections: usize,
    },
    /// 送信者への送信失敗通知
    SendFailed { recipient_id: String, reason: String },
    /// 受信したフレームを処理できなかった
    Error { reason: String },
}

/// MessagePusher trait
///
/// 接続 ID ごとに送信チャンネルを管理し、特定の接続または複数の接続へ
/// イベントを送信する。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_connection(&self, connection_id: ConnectionId, channel: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    ///
    /// チャンネルが破棄されるため、接続側の送信ループは終了する。
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 特定の接続へ送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &PushEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へ送信
    ///
    /// 一部の接続への送信失敗は許容し、実際に送信できた接続数を返す。
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &PushEvent,
    ) -> Result<usize, MessagePushError>;
}
