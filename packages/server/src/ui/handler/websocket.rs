//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle, time::Interval};

use crate::{
    domain::{ConnectionId, DisconnectReason, MessageBody, PushEvent, UserId},
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> UserId (Domain Model)
    let user_id = match query.user_id {
        Some(raw) => {
            let user_id = UserId::try_from(raw.clone()).map_err(|e| {
                tracing::warn!("Invalid user_id '{}': {}", raw, e);
                StatusCode::BAD_REQUEST
            })?;

            let limit = state.config.connection_limit();
            if state.registry.connections_for(&user_id).await.len() >= limit {
                tracing::warn!(
                    "User '{}' already holds {} connections. Rejecting connection.",
                    user_id,
                    limit
                );
                return Err(StatusCode::SERVICE_UNAVAILABLE);
            }
            Some(user_id)
        }
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Spawns a task that pumps the connection's outbound channel into the WebSocket sink.
///
/// Also pings the peer on every heartbeat tick. When the channel is detached from the
/// MessagePusher the loop sends a Close frame and ends.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    heartbeat_interval: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut heartbeat = heartbeat_interval.map(tokio::time::interval);
        if let Some(heartbeat) = heartbeat.as_mut() {
            // 最初の tick は即座に完了する
            heartbeat.tick().await;
        }

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = next_heartbeat(&mut heartbeat) => {
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(heartbeat) => {
            heartbeat.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Encode a frame for a socket that is not attached to the MessagePusher yet
fn error_frame(reason: String) -> Option<Message> {
    serde_json::to_string(&ServerEvent::Error { reason })
        .ok()
        .map(|json| Message::Text(json.into()))
}

async fn reject(mut sender: SplitSink<WebSocket, Message>, reason: String) {
    if let Some(frame) = error_frame(reason) {
        let _ = sender.send(frame).await;
    }
    let _ = sender.send(Message::Close(None)).await;
}

/// Wait for the first frame to be `connect {userId}`
async fn await_connect(
    receiver: &mut SplitStream<WebSocket>,
    handshake_timeout: Duration,
) -> Result<UserId, String> {
    let handshake = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    return match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(ClientEvent::Connect { user_id }) => {
                            UserId::try_from(user_id).map_err(|e| e.to_string())
                        }
                        Ok(_) => Err("the first event must be 'connect'".to_string()),
                        Err(e) => Err(format!("malformed event: {}", e)),
                    };
                }
                Ok(Message::Close(_)) | Err(_) => {
                    return Err("closed before connect".to_string());
                }
                Ok(_) => continue,
            }
        }
        Err("closed before connect".to_string())
    };

    tokio::time::timeout(handshake_timeout, handshake)
        .await
        .unwrap_or_else(|_| Err("timed out waiting for connect".to_string()))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Option<UserId>) {
    let (sender, mut receiver) = socket.split();

    let user_id = match user_id {
        Some(user_id) => user_id,
        None => match await_connect(&mut receiver, state.config.handshake_timeout()).await {
            Ok(user_id) => user_id,
            Err(reason) => {
                tracing::warn!("WebSocket handshake failed: {}", reason);
                reject(sender, reason).await;
                return;
            }
        },
    };

    // Create a channel for this connection to receive events
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = match state
        .connection_lifecycle_usecase
        .connect(user_id.clone(), tx)
        .await
    {
        Ok(connection) => connection,
        Err(e) => {
            reject(sender, e.to_string()).await;
            return;
        }
    };
    let connection_id = connection.id;

    let mut send_task = pusher_loop(rx, sender, state.config.heartbeat_interval());
    let mut recv_task = tokio::spawn(receive_loop(
        receiver,
        state.clone(),
        connection_id,
        user_id,
    ));

    // If any one of the tasks completes, the connection is over
    let (reason, writer_finished) = tokio::select! {
        result = &mut recv_task => (result.unwrap_or(DisconnectReason::TransportClosed), false),
        _ = &mut send_task => {
            recv_task.abort();
            (DisconnectReason::TransportClosed, true)
        }
    };

    state
        .connection_lifecycle_usecase
        .disconnect(&connection_id, reason)
        .await;

    // Detaching the channel lets the writer flush and send a Close frame
    if !writer_finished
        && tokio::time::timeout(Duration::from_secs(1), &mut send_task)
            .await
            .is_err()
    {
        send_task.abort();
    }
}

/// Reads inbound frames until the peer leaves, returning why it ended.
async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    user_id: UserId,
) -> DisconnectReason {
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                return DisconnectReason::TransportClosed;
            }
        };
        state.connection_lifecycle_usecase.touch(&connection_id).await;

        match msg {
            Message::Text(text) => {
                let event = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Failed to parse event from '{}': {}", connection_id, e);
                        reply(
                            &state,
                            &connection_id,
                            PushEvent::Error {
                                reason: format!("malformed event: {}", e),
                            },
                        )
                        .await;
                        continue;
                    }
                };

                match event {
                    ClientEvent::SendMessage { recipient_id, body } => {
                        send_message(&state, &connection_id, &user_id, recipient_id, body).await;
                    }
                    ClientEvent::Disconnect {
                        connection_id: requested,
                    } => {
                        if let Some(requested) = requested
                            && requested != connection_id.to_string()
                        {
                            tracing::warn!(
                                "Connection '{}' asked to disconnect '{}', ignoring",
                                connection_id,
                                requested
                            );
                            continue;
                        }
                        return DisconnectReason::ClientRequested;
                    }
                    ClientEvent::Connect { .. } => {
                        reply(
                            &state,
                            &connection_id,
                            PushEvent::Error {
                                reason: "already connected".to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            Message::Binary(_) => {
                reply(
                    &state,
                    &connection_id,
                    PushEvent::Error {
                        reason: "binary frames are not supported".to_string(),
                    },
                )
                .await;
            }
            Message::Close(_) => {
                tracing::debug!("Connection '{}' sent close", connection_id);
                return DisconnectReason::TransportClosed;
            }
            // Ping/pong is handled automatically by the WebSocket protocol
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    DisconnectReason::TransportClosed
}

async fn send_message(
    state: &AppState,
    connection_id: &ConnectionId,
    sender_id: &UserId,
    recipient_id: String,
    body: String,
) {
    // Convert String -> Domain Models
    let recipient = match UserId::try_from(recipient_id.clone()) {
        Ok(recipient) => recipient,
        Err(e) => {
            reply(state, connection_id, send_failed(recipient_id, e.to_string())).await;
            return;
        }
    };
    let body = match MessageBody::try_from(body) {
        Ok(body) => body,
        Err(e) => {
            reply(state, connection_id, send_failed(recipient_id, e.to_string())).await;
            return;
        }
    };

    match state
        .send_message_usecase
        .execute(sender_id.clone(), recipient, body)
        .await
    {
        Ok(receipt) => {
            tracing::info!(
                "'{}' -> '{}' in conversation '{}' ({} connection(s))",
                sender_id,
                receipt.recipient_id,
                receipt.message.conversation_id,
                receipt.delivered_connections
            );
            let ack = PushEvent::MessageSent {
                conversation_id: receipt.message.conversation_id,
                recipient_id: receipt.recipient_id,
                sent_at: receipt.message.sent_at,
                delivered_connections: receipt.delivered_connections,
            };
            reply(state, connection_id, ack).await;
        }
        Err(e) => {
            tracing::warn!("Failed to send message from '{}': {}", sender_id, e);
            reply(state, connection_id, send_failed(recipient_id, e.to_string())).await;
        }
    }
}

fn send_failed(recipient_id: String, reason: String) -> PushEvent {
    PushEvent::SendFailed {
        recipient_id,
        reason,
    }
}

async fn reply(state: &AppState, connection_id: &ConnectionId, event: PushEvent) {
    if let Err(e) = state.message_pusher.push_to(connection_id, &event).await {
        tracing::warn!("Failed to reply to connection '{}': {}", connection_id, e);
    }
}
