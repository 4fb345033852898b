//! Chatline CLI client with reconnection support.
//!
//! Connects to a Chatline server as the given user, prints presence changes and
//! delivered messages, and sends `@<user> <message>` lines typed at the prompt.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//! A connection rejected by the server (4xx) exits immediately.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chatline-client -- --user-id alice
//! cargo run --bin chatline-client -- -u bob --url ws://127.0.0.1:8080/ws
//! ```

use clap::Parser;

use chatline_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "chatline-client")]
#[command(about = "Chatline CLI client with presence and direct messages", long_about = None)]
struct Args {
    /// User ID to connect as
    #[arg(short = 'u', long)]
    user_id: String,

    /// WebSocket server URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = chatline_client::run_client(args.url, args.user_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
