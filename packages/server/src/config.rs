//! Server configuration.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Minimum number of heartbeat intervals covered by `stale_after`
const MIN_STALE_HEARTBEATS: u64 = 2;

/// Rejected option combinations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "--stale-after-secs ({stale_after_secs}) must be at least twice \
         --heartbeat-interval-secs ({heartbeat_interval_secs})"
    )]
    StaleAfterTooShort {
        stale_after_secs: u64,
        heartbeat_interval_secs: u64,
    },

    #[error("--max-connections-per-user must be at least 1")]
    NoConnectionsAllowed,
}

/// Presence and message routing server
#[derive(Parser, Debug, Clone)]
#[command(name = "chatline-server")]
#[command(about = "Presence-aware two-party chat server over WebSocket", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = 8080)]
    pub port: u16,

    /// Interval between WebSocket pings and stale-connection sweeps (0 disables both)
    #[arg(long, default_value_t = 15)]
    pub heartbeat_interval_secs: u64,

    /// Close connections silent for longer than this (0 disables the sweep)
    #[arg(long, default_value_t = 45)]
    pub stale_after_secs: u64,

    /// Upper bound for a single persistence store call
    #[arg(long, default_value_t = 3000)]
    pub persistence_timeout_ms: u64,

    /// Maximum number of simultaneous connections per user
    #[arg(long, default_value_t = 8)]
    pub max_connections_per_user: usize,

    /// Time allowed for the `connect` frame when the upgrade carried no user_id
    #[arg(long, default_value_t = 5)]
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            heartbeat_interval_secs: 15,
            stale_after_secs: 45,
            persistence_timeout_ms: 3000,
            max_connections_per_user: 8,
            handshake_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    /// `None` when pings are disabled
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    /// `None` when the stale sweep is disabled
    ///
    /// Never shorter than two heartbeat intervals, even for a config built in code
    /// that skipped `validate`.
    pub fn stale_after(&self) -> Option<Duration> {
        if self.heartbeat_interval_secs == 0 || self.stale_after_secs == 0 {
            return None;
        }
        let floor = self
            .heartbeat_interval_secs
            .saturating_mul(MIN_STALE_HEARTBEATS);
        Some(Duration::from_secs(self.stale_after_secs.max(floor)))
    }

    /// Per-user connection limit, never below one
    pub fn connection_limit(&self) -> usize {
        self.max_connections_per_user.max(1)
    }

    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check option combinations clap cannot express
    ///
    /// `stale_after` must cover at least two heartbeat intervals, otherwise an idle
    /// peer is swept before it had a ping to answer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections_per_user == 0 {
            return Err(ConfigError::NoConnectionsAllowed);
        }
        if self.stale_after().is_some()
            && self.stale_after_secs
                < self
                    .heartbeat_interval_secs
                    .saturating_mul(MIN_STALE_HEARTBEATS)
        {
            return Err(ConfigError::StaleAfterTooShort {
                stale_after_secs: self.stale_after_secs,
                heartbeat_interval_secs: self.heartbeat_interval_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        // テスト項目: 引数なしでパースした値が Default と一致する
        // given (前提条件):
        let args = ["chatline-server"];

        // when (操作):
        let config = ServerConfig::parse_from(args);

        // then (期待する結果):
        let default = ServerConfig::default();
        assert_eq!(config.host, default.host);
        assert_eq!(config.port, default.port);
        assert_eq!(config.heartbeat_interval_secs, default.heartbeat_interval_secs);
        assert_eq!(config.stale_after_secs, default.stale_after_secs);
        assert_eq!(config.persistence_timeout_ms, default.persistence_timeout_ms);
        assert_eq!(
            config.max_connections_per_user,
            default.max_connections_per_user
        );
        assert_eq!(config.handshake_timeout_secs, default.handshake_timeout_secs);
    }

    #[test]
    fn test_zero_stale_after_disables_sweep() {
        // テスト項目: --stale-after-secs 0 で掃除が無効になる
        // given (前提条件):
        let args = ["chatline-server", "--stale-after-secs", "0", "-p", "3000"];

        // when (操作):
        let config = ServerConfig::parse_from(args);

        // then (期待する結果):
        assert_eq!(config.stale_after(), None);
        assert_eq!(config.heartbeat_interval(), Some(Duration::from_secs(15)));
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_zero_heartbeat_disables_pings_and_sweep() {
        // テスト項目: --heartbeat-interval-secs 0 で ping と掃除の両方が無効になる
        // given (前提条件):
        let args = ["chatline-server", "--heartbeat-interval-secs", "0"];

        // when (操作):
        let config = ServerConfig::parse_from(args);

        // then (期待する結果):
        assert_eq!(config.heartbeat_interval(), None);
        assert_eq!(config.stale_after(), None);
    }

    #[test]
    fn test_defaults_are_valid() {
        // テスト項目: デフォルト設定はバリデーションを通る
        // given (前提条件):
        let config = ServerConfig::default();

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_stale_after_shorter_than_two_heartbeats_is_rejected() {
        // テスト項目: stale_after が heartbeat の 2 倍未満だと拒否される（ping に応答する前に掃除されるため）
        // given (前提条件):
        let too_short = ServerConfig::parse_from([
            "chatline-server",
            "--heartbeat-interval-secs",
            "2",
            "--stale-after-secs",
            "1",
        ]);
        let one_interval = ServerConfig::parse_from([
            "chatline-server",
            "--heartbeat-interval-secs",
            "15",
            "--stale-after-secs",
            "15",
        ]);
        let two_intervals = ServerConfig::parse_from([
            "chatline-server",
            "--heartbeat-interval-secs",
            "15",
            "--stale-after-secs",
            "30",
        ]);

        // when (操作):

        // then (期待する結果):
        assert_eq!(
            too_short.validate(),
            Err(ConfigError::StaleAfterTooShort {
                stale_after_secs: 1,
                heartbeat_interval_secs: 2,
            })
        );
        assert!(one_interval.validate().is_err());
        assert_eq!(two_intervals.validate(), Ok(()));
    }

    #[test]
    fn test_disabled_sweep_skips_stale_after_check() {
        // テスト項目: 掃除が無効な場合は stale_after の下限チェックを行わない
        // given (前提条件):
        let config = ServerConfig::parse_from([
            "chatline-server",
            "--heartbeat-interval-secs",
            "0",
            "--stale-after-secs",
            "1",
        ]);

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_zero_connections_per_user_is_rejected() {
        // テスト項目: --max-connections-per-user 0 は拒否される
        // given (前提条件):
        let config =
            ServerConfig::parse_from(["chatline-server", "--max-connections-per-user", "0"]);

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::NoConnectionsAllowed));
    }

    #[test]
    fn test_stale_after_is_clamped_to_two_heartbeats() {
        // テスト項目: validate を通さずに組み立てた設定でも stale_after は heartbeat の 2 倍を下回らない
        // given (前提条件):
        let config = ServerConfig {
            heartbeat_interval_secs: 2,
            stale_after_secs: 1,
            ..ServerConfig::default()
        };

        // when (操作):
        let stale_after = config.stale_after();

        // then (期待する結果):
        assert_eq!(stale_after, Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_connection_limit_is_at_least_one() {
        // テスト項目: validate を通さずに 0 を指定しても接続上限は 1 になる
        // given (前提条件):
        let config = ServerConfig {
            max_connections_per_user: 0,
            ..ServerConfig::default()
        };

        // when (操作):
        let limit = config.connection_limit();

        // then (期待する結果):
        assert_eq!(limit, 1);
    }
}
