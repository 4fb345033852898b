//! Presence and message routing core for two-party chat.
//!
//! Tracks which users hold live WebSocket connections, resolves the
//! conversation between two users and routes messages to the recipient's
//! connections, persisting every message before it is delivered.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
