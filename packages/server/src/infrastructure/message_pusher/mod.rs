//! `MessagePusher` trait の実装
//!
//! - `websocket`: 接続ごとの mpsc チャンネルへ JSON フレームを流す実装

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
