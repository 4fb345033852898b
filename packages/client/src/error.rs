//! Error types for the Chatline client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the WebSocket upgrade with a 4xx status
    #[error("Connection rejected by server with status {0}")]
    Rejected(u16),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server URL cannot carry a user id
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),
}

/// Errors for lines typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Missing recipient, use '@<user> <message>'")]
    MissingRecipient,

    #[error("Message to '{0}' is empty")]
    EmptyMessage(String),

    #[error("Unknown command '{0}', type /help")]
    UnknownCommand(String),
}
