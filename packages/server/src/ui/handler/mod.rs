//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{
    get_message_history, get_presence, health_check, list_conversations, resolve_conversation,
};
pub use websocket::websocket_handler;
