//! Connection Registry
//!
//! ユーザー ID と、そのユーザーが保持している生きた接続の集合の対応表。
//! 「誰がオンラインか」の唯一の情報源です。
//!
//! ## 並行性
//!
//! 内部の状態は 1 つの Mutex で保護され、変更は直列化されます。
//! 読み取り（`snapshot`, `connections_for`）も同じロックを取るため、
//! 実際に存在した状態だけを観測します。
//!
//! ## 変更フィード
//!
//! `register` / `unregister` が状態を変えるたびに、ロックを保持したまま
//! 名簿のスナップショットを変更フィードへ送ります。フィードの順序は
//! 変更が適用された順序と一致します。送信は非ブロッキングなので、
//! 配信側が遅くても Registry の変更は止まりません。

use std::collections::{BTreeSet, HashMap, HashSet};

use tokio::sync::{Mutex, mpsc};

use super::{ConnectionId, PresenceRoster, RegistryError, UserId};

/// 変更フィードの受信側
pub type RosterFeed = mpsc::UnboundedReceiver<PresenceRoster>;

/// `register` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// 新しく登録した（`came_online` はオフラインからオンラインになったか）
    Registered { came_online: bool },
    /// 既に登録済み（何もしない）
    AlreadyRegistered,
}

/// `unregister` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// 登録を解除した（`went_offline` は最後の接続だったか）
    Unregistered { user_id: UserId, went_offline: bool },
    /// 未知の接続（何もしない）
    UnknownConnection,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// user_id -> 接続の集合（空の集合は保持しない）
    entries: HashMap<UserId, HashSet<ConnectionId>>,
    /// connection_id -> user_id
    owners: HashMap<ConnectionId, UserId>,
    /// 適用済みの変更回数
    version: u64,
}

impl RegistryState {
    fn roster(&self) -> PresenceRoster {
        let mut connection_ids: Vec<ConnectionId> = self.owners.keys().copied().collect();
        connection_ids.sort();
        PresenceRoster {
            version: self.version,
            online_user_ids: self.entries.keys().cloned().collect::<BTreeSet<_>>(),
            connection_ids,
        }
    }
}

/// Connection Registry
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
    changes: mpsc::UnboundedSender<PresenceRoster>,
    /// 1 ユーザーあたりの最大接続数（`None` は無制限）
    connection_limit: Option<usize>,
}

impl ConnectionRegistry {
    /// 接続数の制限がない Registry と、その変更フィードを作成
    pub fn new() -> (Self, RosterFeed) {
        Self::build(None)
    }

    /// 1 ユーザーあたりの接続数を `limit` に制限した Registry を作成
    pub fn with_connection_limit(limit: usize) -> (Self, RosterFeed) {
        Self::build(Some(limit))
    }

    fn build(connection_limit: Option<usize>) -> (Self, RosterFeed) {
        let (changes, feed) = mpsc::unbounded_channel();
        let registry = Self {
            state: Mutex::new(RegistryState::default()),
            changes,
            connection_limit,
        };
        (registry, feed)
    }

    /// 接続を登録
    ///
    /// 同じ組の再登録は何もしない（冪等）。
    pub async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<RegisterOutcome, RegistryError> {
        let mut state = self.state.lock().await;

        if let Some(owner) = state.owners.get(&connection_id) {
            if owner != &user_id {
                tracing::warn!(
                    "Connection '{}' is already owned by '{}', ignoring registration for '{}'",
                    connection_id,
                    owner,
                    user_id
                );
            }
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        let current = state.entries.get(&user_id).map_or(0, HashSet::len);
        if let Some(limit) = self.connection_limit
            && current >= limit
        {
            return Err(RegistryError::CapacityExceeded {
                user_id: user_id.into_string(),
                limit,
            });
        }

        state.owners.insert(connection_id, user_id.clone());
        state
            .entries
            .entry(user_id)
            .or_default()
            .insert(connection_id);
        state.version += 1;
        self.publish(&state);

        Ok(RegisterOutcome::Registered {
            came_online: current == 0,
        })
    }

    /// 接続の登録を解除
    ///
    /// 最後の接続だった場合はエントリごと削除する。未知の接続は何もしない（冪等）。
    pub async fn unregister(&self, connection_id: &ConnectionId) -> UnregisterOutcome {
        let mut state = self.state.lock().await;

        let Some(user_id) = state.owners.remove(connection_id) else {
            return UnregisterOutcome::UnknownConnection;
        };

        let went_offline = match state.entries.get_mut(&user_id) {
            Some(connections) => {
                connections.remove(connection_id);
                connections.is_empty()
            }
            None => true,
        };
        if went_offline {
            state.entries.remove(&user_id);
        }
        state.version += 1;
        self.publish(&state);

        UnregisterOutcome::Unregistered {
            user_id,
            went_offline,
        }
    }

    /// ユーザーの生きた接続を取得（オフラインなら空）
    pub async fn connections_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let mut connections: Vec<ConnectionId> = state
            .entries
            .get(user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        connections.sort();
        connections
    }

    /// 現時点のオンライン名簿
    pub async fn snapshot(&self) -> PresenceRoster {
        self.state.lock().await.roster()
    }

    fn publish(&self, state: &RegistryState) {
        if self.changes.send(state.roster()).is_err() {
            tracing::debug!("Roster feed closed, skipping presence change notification");
        }
    }
}
