//! Entity 定義
//!
//! 識別子によって同一性が決まるドメインオブジェクト。

use std::collections::BTreeSet;

use super::{
    error::LifecycleError,
    value_object::{ConnectionId, ConversationId, MemberPair, MessageBody, Timestamp, UserId},
};

/// 接続の状態
///
/// `Connecting → Active → Closed` の一方向のみ遷移する。`Closed` は終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Closed,
}

/// 切断理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// クライアントが明示的に `disconnect` を送った
    ClientRequested,
    /// トランスポートが閉じた（タブを閉じた、ネットワーク断など）
    TransportClosed,
    /// ハートビートが途絶えた
    Stale,
}

/// 1 本のトランスポート接続
///
/// Lifecycle Manager だけが所有し、永続化されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub established_at: Timestamp,
    pub last_seen_at: Timestamp,
    state: ConnectionState,
}

impl Connection {
    /// `Connecting` 状態の接続を作成
    pub fn open(id: ConnectionId, user_id: UserId, established_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            established_at,
            last_seen_at: established_at,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    /// `Connecting → Active`
    pub fn activate(&mut self) -> Result<(), LifecycleError> {
        self.transition(ConnectionState::Connecting, ConnectionState::Active)
    }

    /// `Connecting | Active → Closed`
    pub fn close(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            ConnectionState::Closed => Err(LifecycleError::InvalidTransition {
                from: ConnectionState::Closed,
                to: ConnectionState::Closed,
            }),
            _ => {
                self.state = ConnectionState::Closed;
                Ok(())
            }
        }
    }

    /// 受信を記録する（時刻は単調増加のみ）
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_seen_at {
            self.last_seen_at = now;
        }
    }

    /// `now` 時点で `max_idle_millis` より長く無通信か
    pub fn is_stale(&self, now: Timestamp, max_idle_millis: i64) -> bool {
        self.is_active() && self.last_seen_at.elapsed_until(now) > max_idle_millis
    }

    fn transition(
        &mut self,
        expected: ConnectionState,
        next: ConnectionState,
    ) -> Result<(), LifecycleError> {
        if self.state != expected {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// 2 人の会話
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub members: MemberPair,
    pub created_at: Timestamp,
}

impl Conversation {
    pub fn new(id: ConversationId, members: MemberPair, created_at: Timestamp) -> Self {
        Self {
            id,
            members,
            created_at,
        }
    }
}

/// 会話一覧の 1 行（相手と、マッチした時刻）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub partner_id: UserId,
    /// 会話の作成時刻（最新メッセージの時刻ではない）
    pub matched_at: Timestamp,
}

/// チャットメッセージ（作成後は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: MessageBody,
    pub sent_at: Timestamp,
}

impl Message {
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        body: MessageBody,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            conversation_id,
            sender_id,
            body,
            sent_at,
        }
    }
}

/// オンライン名簿のスナップショット
///
/// Registry の 1 回の変更直後の状態をそのまま写したもの。
/// `version` は適用済みの変更回数で、単調増加する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRoster {
    pub version: u64,
    pub online_user_ids: BTreeSet<UserId>,
    /// スナップショット時点で登録されていた全接続（配信先）
    pub connection_ids: Vec<ConnectionId>,
}

impl PresenceRoster {
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.online_user_ids.contains(user_id)
    }
}
