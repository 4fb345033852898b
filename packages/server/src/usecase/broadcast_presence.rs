//! UseCase: 在室状況の配信
//!
//! Connection Registry の変更フィードを 1 つのタスクで消費し、
//! 各スナップショットをその時点で登録されていた全接続へ送ります。
//! 消費者が 1 つなので、各接続には変更が適用された順に名簿が届きます。

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::{MessagePusher, PresenceRoster, PushEvent, RosterFeed};

/// Presence Broadcaster
pub struct PresenceBroadcaster {
    message_pusher: Arc<dyn MessagePusher>,
}

impl PresenceBroadcaster {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 名簿をスナップショット時点の全接続へ送信し、送信できた接続数を返す
    pub async fn publish(&self, roster: &PresenceRoster) -> usize {
        let event = PushEvent::RosterUpdate(roster.clone());
        match self
            .message_pusher
            .broadcast(&roster.connection_ids, &event)
            .await
        {
            Ok(delivered) => {
                tracing::debug!(
                    "Roster v{} ({} online) pushed to {}/{} connection(s)",
                    roster.version,
                    roster.online_user_ids.len(),
                    delivered,
                    roster.connection_ids.len()
                );
                delivered
            }
            Err(e) => {
                tracing::warn!("Failed to broadcast roster v{}: {}", roster.version, e);
                0
            }
        }
    }

    /// 変更フィードが閉じるまで名簿を配信し続けるタスクを起動
    pub fn spawn(self, mut feed: RosterFeed) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(roster) = feed.recv().await {
                self.publish(&roster).await;
            }
            tracing::debug!("Roster feed closed, presence broadcaster stopped");
        })
    }
}
