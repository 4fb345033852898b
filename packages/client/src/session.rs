//! WebSocket client session management.

use std::sync::Arc;

use chatline_server::infrastructure::dto::{
    http::ConversationSummaryDto,
    websocket::{ClientEvent, ServerEvent},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use reqwest::Url;
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    domain::{Command, RosterView, conversations_url, parse_input, session_url},
    error::ClientError,
    formatter::MessageFormatter,
};

use super::ui::redisplay_prompt;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Run one WebSocket session until the user quits or the connection is lost
///
/// Returns `Ok(())` when the user ended the session (`/quit`, Ctrl+C, Ctrl+D).
pub async fn run_client_session(
    url: &str,
    user_id: &str,
    http_base: Option<&str>,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let url = session_url(url, user_id)?;

    let (ws_stream, _response) = match connect_async(url.as_str()).await {
        Ok(result) => result,
        Err(tungstenite::Error::Http(response)) => {
            return Err(ClientError::Rejected(response.status().as_u16()));
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to chat server!");
    println!(
        "\nYou are '{}'. Type '@<user> <message>' to send, /help for commands.\n",
        user_id
    );

    let (mut write, read) = ws_stream.split();
    let roster = Arc::new(Mutex::new(RosterView::default()));

    let mut read_task = tokio::spawn(read_loop(read, user_id.to_string(), roster.clone()));
    let http = reqwest::Client::new();

    loop {
        tokio::select! {
            _ = &mut read_task => {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input.recv() => {
                let command = match line {
                    Some(line) => match parse_input(&line) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{}", e);
                            redisplay_prompt(user_id);
                            continue;
                        }
                    },
                    // The line reader stopped (Ctrl+C / Ctrl+D)
                    None => Command::Quit,
                };

                match command {
                    Command::Send { recipient_id, body } => {
                        let event = ClientEvent::SendMessage { recipient_id, body };
                        if let Err(e) = send_event(&mut write, &event).await {
                            read_task.abort();
                            return Err(e);
                        }
                    }
                    Command::Who => {
                        let roster = roster.lock().await;
                        print!("{}", MessageFormatter::format_roster(&roster, user_id));
                        redisplay_prompt(user_id);
                    }
                    Command::ListConversations => {
                        print_conversations(&http, http_base, user_id, &roster).await;
                        redisplay_prompt(user_id);
                    }
                    Command::Help => {
                        println!("{}", MessageFormatter::format_help());
                        redisplay_prompt(user_id);
                    }
                    Command::Quit => {
                        let event = ClientEvent::Disconnect { connection_id: None };
                        if let Err(e) = send_event(&mut write, &event).await {
                            tracing::warn!("Failed to send disconnect: {}", e);
                        }
                        write.close().await.ok();
                        read_task.abort();
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn send_event(
    write: &mut SplitSink<WsStream, Message>,
    event: &ClientEvent,
) -> Result<(), ClientError> {
    let json = serde_json::to_string(event)
        .map_err(|e| ClientError::ConnectionError(format!("Failed to serialize event: {}", e)))?;

    write.send(Message::Text(json.into())).await.map_err(|e| {
        tracing::warn!("Failed to send event: {}", e);
        ClientError::ConnectionError("Connection lost".to_string())
    })
}

async fn print_conversations(
    http: &reqwest::Client,
    http_base: Option<&str>,
    user_id: &str,
    roster: &Mutex<RosterView>,
) {
    let Some(http_base) = http_base else {
        println!("\nConversation list needs a ws:// or wss:// server URL");
        return;
    };

    let url = match conversations_url(http_base, user_id) {
        Ok(url) => url,
        Err(e) => {
            println!("\n{}", e);
            return;
        }
    };

    match fetch_conversations(http, url).await {
        Ok(conversations) => {
            let roster = roster.lock().await;
            print!(
                "{}",
                MessageFormatter::format_conversations(&conversations, &roster)
            );
        }
        Err(e) => {
            tracing::warn!("Failed to fetch conversations: {}", e);
            println!("\nCould not load conversations: {}", e);
        }
    }
}

async fn fetch_conversations(
    http: &reqwest::Client,
    url: Url,
) -> Result<Vec<ConversationSummaryDto>, reqwest::Error> {
    http.get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Prints server events until the server closes the connection or the read fails
async fn read_loop(
    mut read: SplitStream<WsStream>,
    user_id: String,
    roster: Arc<Mutex<RosterView>>,
) {
    while let Some(message) = read.next().await {
        let output = match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                Ok(event) => {
                    let mut roster = roster.lock().await;
                    render_event(event, &user_id, &mut roster)
                }
                Err(_) => Some(MessageFormatter::format_raw_message(&text)),
            },
            Ok(Message::Binary(data)) => Some(MessageFormatter::format_binary_message(data.len())),
            Ok(Message::Close(_)) => {
                tracing::info!("Server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
            _ => None,
        };

        if let Some(output) = output {
            print!("{}", output);
            redisplay_prompt(&user_id);
        }
    }
}

/// Turn a server event into terminal output, updating the roster view.
///
/// Stale roster updates produce no output.
fn render_event(event: ServerEvent, user_id: &str, roster: &mut RosterView) -> Option<String> {
    match event {
        ServerEvent::Connected {
            connection_id,
            user_id: connected_as,
            connected_at,
        } => Some(MessageFormatter::format_connected(
            &connected_as,
            &connection_id,
            connected_at,
        )),
        ServerEvent::RosterUpdate {
            version,
            online_user_ids,
        } => {
            if roster.apply(version, online_user_ids) {
                Some(MessageFormatter::format_roster(roster, user_id))
            } else {
                None
            }
        }
        ServerEvent::MessageDelivered {
            sender_id,
            body,
            sent_at,
            ..
        } => Some(MessageFormatter::format_message_delivered(
            &sender_id, &body, sent_at,
        )),
        ServerEvent::MessageSent {
            recipient_id,
            sent_at,
            delivered_connections,
            ..
        } => Some(MessageFormatter::format_message_sent(
            &recipient_id,
            sent_at,
            delivered_connections,
        )),
        ServerEvent::SendFailed {
            recipient_id,
            reason,
        } => Some(MessageFormatter::format_send_failed(&recipient_id, &reason)),
        ServerEvent::Error { reason } => Some(MessageFormatter::format_server_error(&reason)),
    }
}
