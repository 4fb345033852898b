//! Integration tests driving the real router over WebSocket and HTTP.

use std::time::Duration;

use chatline_server::{config::ServerConfig, ui::Server};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message},
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper struct to manage an in-process server on an ephemeral port
struct TestServer {
    handle: JoinHandle<()>,
    addr: String,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    async fn start_with(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let router = Server::new(config).router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        TestServer { handle, addr }
    }

    fn ws_url(&self, user_id: &str) -> String {
        format!("ws://{}/ws?user_id={}", self.addr, user_id)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self, user_id: &str) -> Ws {
        let (ws, _) = connect_async(self.ws_url(user_id)).await.unwrap();
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read the next JSON event, skipping control frames
async fn next_event(ws: &mut Ws) -> Value {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(_))) | None => panic!("socket closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("socket error: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for an event")
}

/// Read events until one satisfies `predicate`
async fn wait_for(ws: &mut Ws, predicate: impl Fn(&Value) -> bool) -> Value {
    loop {
        let event = next_event(ws).await;
        if predicate(&event) {
            return event;
        }
    }
}

async fn wait_for_roster(ws: &mut Ws, online: &[&str]) -> Value {
    let expected: Vec<Value> = online.iter().map(|id| json!(id)).collect();
    wait_for(ws, |event| {
        event["type"] == "roster-update" && event["onlineUserIds"] == Value::Array(expected.clone())
    })
    .await
}

async fn wait_for_type(ws: &mut Ws, event_type: &str) -> Value {
    wait_for(ws, |event| event["type"] == event_type).await
}

/// Assert that no event of `event_type` arrives within a short window
async fn assert_no_event(ws: &mut Ws, event_type: &str) {
    let result = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let event: Value = serde_json::from_str(text.as_str()).unwrap();
                    if event["type"] == event_type {
                        return event;
                    }
                }
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(result.is_err(), "unexpected {} event: {:?}", event_type, result);
}

async fn send_event(ws: &mut Ws, event: Value) {
    ws.send(Message::Text(event.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn test_presence_and_message_routing_scenario() {
    // テスト項目: 接続、在室状況、配信、切断、オフライン保存の一連の流れ
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let connected = wait_for_type(&mut alice, "connected").await;
    assert_eq!(connected["userId"], "alice");

    // when (操作): B が接続
    let mut bob = server.connect("bob").await;

    // then (期待する結果): 両者に {alice, bob} が届く
    wait_for_roster(&mut alice, &["alice", "bob"]).await;
    wait_for_roster(&mut bob, &["alice", "bob"]).await;

    // when (操作): A が B に "hi" を送る
    send_event(
        &mut alice,
        json!({"type": "send-message", "recipientId": "bob", "body": "hi"}),
    )
    .await;

    // then (期待する結果): B に配信され、A に送信完了が届く
    let delivered = wait_for_type(&mut bob, "message-delivered").await;
    assert_eq!(delivered["senderId"], "alice");
    assert_eq!(delivered["body"], "hi");
    let sent = wait_for_type(&mut alice, "message-sent").await;
    assert_eq!(sent["recipientId"], "bob");
    assert_eq!(sent["deliveredConnections"], 1);
    assert_eq!(sent["conversationId"], delivered["conversationId"]);

    // when (操作): B が切断
    bob.close(None).await.unwrap();

    // then (期待する結果): A に {alice} が届く
    wait_for_roster(&mut alice, &["alice"]).await;

    // when (操作): オフラインの B に送る
    send_event(
        &mut alice,
        json!({"type": "send-message", "recipientId": "bob", "body": "still there?"}),
    )
    .await;

    // then (期待する結果): 配信はないが保存される
    let sent = wait_for_type(&mut alice, "message-sent").await;
    assert_eq!(sent["deliveredConnections"], 0);

    let conversation_id = sent["conversationId"].as_str().unwrap().to_string();
    let history: Vec<Value> = reqwest::get(server.http_url(&format!(
        "/api/conversations/{}/messages",
        conversation_id
    )))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let bodies: Vec<&str> = history
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["hi", "still there?"]);

    let conversations: Vec<Value> = reqwest::get(server.http_url("/api/users/bob/conversations"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["partnerId"], "alice");
    assert_eq!(conversations[0]["conversationId"], conversation_id);
}

#[tokio::test]
async fn test_two_tabs_receive_identical_events() {
    // テスト項目: 受信者の 2 つのタブに同一の message-delivered が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut tab1 = server.connect("bob").await;
    let mut tab2 = server.connect("bob").await;
    wait_for_type(&mut tab1, "connected").await;
    wait_for_type(&mut tab2, "connected").await;

    // when (操作):
    send_event(
        &mut alice,
        json!({"type": "send-message", "recipientId": "bob", "body": "hello tabs"}),
    )
    .await;

    // then (期待する結果):
    let event1 = wait_for_type(&mut tab1, "message-delivered").await;
    let event2 = wait_for_type(&mut tab2, "message-delivered").await;
    assert_eq!(event1, event2);
    let sent = wait_for_type(&mut alice, "message-sent").await;
    assert_eq!(sent["deliveredConnections"], 2);

    // 1 つのタブを閉じてもオンラインのまま
    tab1.close(None).await.unwrap();
    let presence: Value = reqwest::get(server.http_url("/api/presence"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        presence["onlineUserIds"]
            .as_array()
            .unwrap()
            .contains(&json!("bob"))
    );
}

#[tokio::test]
async fn test_connect_with_first_frame() {
    // テスト項目: user_id なしで接続し、最初のフレームで名乗れる
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut ws, _) = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();

    // when (操作):
    send_event(&mut ws, json!({"type": "connect", "userId": "carol"})).await;

    // then (期待する結果):
    let connected = wait_for_type(&mut ws, "connected").await;
    assert_eq!(connected["userId"], "carol");
    let presence: Value = reqwest::get(server.http_url("/api/presence"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(presence["onlineUserIds"], json!(["carol"]));
}

#[tokio::test]
async fn test_invalid_user_id_is_rejected() {
    // テスト項目: 不正な user_id での接続は 400 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url("a%20b")).await;

    // then (期待する結果):
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 400),
        other => panic!("expected HTTP 400, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_connection_limit_is_enforced() {
    // テスト項目: 1 ユーザーの接続数上限を超えると 503 で拒否される
    // given (前提条件):
    let config = ServerConfig {
        max_connections_per_user: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::start_with(config).await;
    let mut first = server.connect("alice").await;
    wait_for_type(&mut first, "connected").await;

    // when (操作):
    let result = connect_async(server.ws_url("alice")).await;

    // then (期待する結果):
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 503),
        other => panic!("expected HTTP 503, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_malformed_event_yields_error() {
    // テスト項目: デコードできないフレームには error イベントが返り、接続は続く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    wait_for_type(&mut alice, "connected").await;

    // when (操作):
    alice
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();

    // then (期待する結果):
    let error = wait_for_type(&mut alice, "error").await;
    assert!(error["reason"].as_str().unwrap().contains("malformed"));

    send_event(
        &mut alice,
        json!({"type": "send-message", "recipientId": "alice", "body": "me"}),
    )
    .await;
    let failed = wait_for_type(&mut alice, "send-failed").await;
    assert_eq!(failed["recipientId"], "alice");
}

#[tokio::test]
async fn test_explicit_disconnect_converges_with_close() {
    // テスト項目: disconnect イベントで切断され、相手の名簿から消える
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let connected = wait_for_type(&mut bob, "connected").await;
    wait_for_roster(&mut alice, &["alice", "bob"]).await;

    // when (操作):
    send_event(
        &mut bob,
        json!({"type": "disconnect", "connectionId": connected["connectionId"]}),
    )
    .await;

    // then (期待する結果):
    wait_for_roster(&mut alice, &["alice"]).await;
    assert_no_event(&mut alice, "message-delivered").await;
}

#[tokio::test]
async fn test_resolve_conversation_over_http() {
    // テスト項目: メンバーの順序に関わらず同じ会話が返り、同一メンバーは 400
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let url = server.http_url("/api/conversations");

    // when (操作):
    let first: Value = client
        .post(&url)
        .json(&json!({"memberA": "alice", "memberB": "bob"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .post(&url)
        .json(&json!({"memberA": "bob", "memberB": "alice"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let same = client
        .post(&url)
        .json(&json!({"memberA": "bob", "memberB": "bob"}))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(first["conversationId"], second["conversationId"]);
    assert_eq!(first["members"], json!(["alice", "bob"]));
    assert_eq!(same.status(), 400);
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let body: Value = reqwest::get(server.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_idle_client_answering_pings_is_not_swept() {
    // テスト項目: ping に応答するだけの無言のクライアントは stale として切断されない
    // given (前提条件): stale_after が heartbeat より短い設定（2 倍に引き上げられる）
    let config = ServerConfig {
        heartbeat_interval_secs: 1,
        stale_after_secs: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::start_with(config).await;
    let mut alice = server.connect("alice").await;
    wait_for_type(&mut alice, "connected").await;

    // when (操作): 何も送らずに読み続ける（pong は自動で返る）
    let mut pings = 0;
    let closed = tokio::time::timeout(Duration::from_millis(3500), async {
        loop {
            match alice.next().await {
                Some(Ok(Message::Ping(_))) => pings += 1,
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .is_ok();

    // then (期待する結果): 切断されず、オンラインのまま
    assert!(!closed, "server closed an idle but healthy connection");
    assert!(pings >= 2, "expected heartbeat pings, got {}", pings);
    let presence: Value = reqwest::get(server.http_url("/api/presence"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(presence["onlineUserIds"], json!(["alice"]));
}
