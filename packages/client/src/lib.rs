//! Chatline CLI client.
//!
//! Connects to a Chatline server over WebSocket, prints presence and delivered
//! messages, and sends messages typed at the prompt.

pub mod domain;
pub mod error;
pub mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
