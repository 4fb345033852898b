//! Domain logic for client-side operations.
//!
//! Pure functions and state with no I/O, so they are easy to test.

use std::collections::BTreeSet;

use reqwest::Url;

use crate::error::{ClientError, InputError};

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `@bob hello`
    Send { recipient_id: String, body: String },
    /// `/who`
    Who,
    /// `/list`
    ListConversations,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

/// Parse a trimmed, non-empty input line.
pub fn parse_input(line: &str) -> Result<Command, InputError> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix('@') {
        let (recipient_id, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if recipient_id.is_empty() {
            return Err(InputError::MissingRecipient);
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(InputError::EmptyMessage(recipient_id.to_string()));
        }
        return Ok(Command::Send {
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
        });
    }

    match line {
        "/who" => Ok(Command::Who),
        "/list" => Ok(Command::ListConversations),
        "/help" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        other if other.starts_with('/') => Err(InputError::UnknownCommand(other.to_string())),
        _ => Err(InputError::MissingRecipient),
    }
}

/// Last roster seen on this connection.
///
/// Updates carrying an older version than the one already applied are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    version: u64,
    online_user_ids: BTreeSet<String>,
}

impl RosterView {
    /// Apply a roster update, returning `false` if it was stale
    pub fn apply(&mut self, version: u64, online_user_ids: Vec<String>) -> bool {
        if version < self.version {
            return false;
        }
        self.version = version;
        self.online_user_ids = online_user_ids.into_iter().collect();
        true
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_user_ids.contains(user_id)
    }

    /// Online users in ascending order
    pub fn online_user_ids(&self) -> Vec<String> {
        self.online_user_ids.iter().cloned().collect()
    }
}

/// Derive the HTTP API base URL from the WebSocket URL.
///
/// `ws://127.0.0.1:8080/ws` becomes `http://127.0.0.1:8080`.
pub fn http_base_url(ws_url: &str) -> Option<String> {
    let (scheme, rest) = ws_url.split_once("://")?;
    let scheme = match scheme {
        "ws" => "http",
        "wss" => "https",
        _ => return None,
    };
    let authority = rest.split(['/', '?']).next().filter(|a| !a.is_empty())?;
    Some(format!("{}://{}", scheme, authority))
}

/// WebSocket URL with `user_id` appended as a percent-encoded query parameter
pub fn session_url(ws_url: &str, user_id: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(ws_url).map_err(|_| ClientError::InvalidUrl(ws_url.to_string()))?;
    url.query_pairs_mut().append_pair("user_id", user_id);
    Ok(url)
}

/// `GET /api/users/{user_id}/conversations` with `user_id` as one encoded path segment
pub fn conversations_url(http_base: &str, user_id: &str) -> Result<Url, ClientError> {
    let invalid = || ClientError::InvalidUrl(http_base.to_string());
    let mut url = Url::parse(http_base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["api", "users", user_id, "conversations"]);
    Ok(url)
}

/// Check if the client should exit immediately based on the error type.
///
/// # Returns
///
/// `true` if the server rejected the connection (4xx) or the URL is unusable,
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    match error {
        ClientError::Rejected(status) => (400..500).contains(status),
        ClientError::InvalidUrl(_) => true,
        ClientError::ConnectionError(_) => false,
    }
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}
