// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over a real socket: gateway, engine, SQLite and mock transports.
//!
//! Each test binds its own gateway on an ephemeral port. Tests are
//! independent and order-insensitive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use wadesk_config::model::ServerConfig;
use wadesk_core::{SessionId, TransportEvent, TransportFactory, TransportMessage};
use wadesk_engine::{AiControl, Engine, EngineDeps, StartOutcome};
use wadesk_gateway::{ConnectionHub, Gateway, GatewayState, StaticTokenVerifier};
use wadesk_test_utils::{MockTransport, TestHarness};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHAT: &str = "972501234567@c.us";

struct Stack {
    harness: TestHarness,
    engine: Engine,
    gateway: Gateway,
    addr: SocketAddr,
    transport: Arc<MockTransport>,
}

async fn stack() -> Stack {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.register("s1", "u1").await.unwrap();
    let transport = harness.transports.prepare(&SessionId::from("s1")).await;

    let cancel = CancellationToken::new();
    let hub = Arc::new(ConnectionHub::new());
    let deps = EngineDeps {
        store: harness.storage.clone(),
        llm: harness.llm.clone(),
        transcriber: harness.transcriber.clone(),
        fanout: hub.clone(),
        ai: Arc::new(AiControl::new(false, Duration::from_secs(300))),
        config: Arc::new(harness.config.clone()),
    };
    let factory: Arc<dyn TransportFactory> = harness.transports.clone();
    let engine = Engine::new(deps, factory, cancel.clone());
    assert_eq!(
        engine.sessions.start_session(&SessionId::from("s1")).await,
        StartOutcome::Started
    );

    let verifier = Arc::new(StaticTokenVerifier::new([("tok-1", "u1"), ("tok-2", "u2")]));
    let state = GatewayState::new(Arc::clone(&engine.ops), hub, verifier, cancel);
    let gateway = Gateway::new(
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        state,
    );
    let addr = gateway.start().await.unwrap();

    Stack {
        harness,
        engine,
        gateway,
        addr,
        transport,
    }
}

async fn connect(addr: SocketAddr, token: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    socket
}

/// Next frame whose `type` is `wanted`, skipping everything else.
async fn next_of(socket: &mut Socket, wanted: &str) -> Value {
    let wait = async {
        while let Some(msg) = socket.next().await {
            if let Message::Text(text) = msg.unwrap() {
                let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                if frame["type"] == wanted {
                    return frame;
                }
            }
        }
        panic!("socket closed before {wanted}");
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
}

async fn send(socket: &mut Socket, command: Value) {
    socket
        .send(Message::Text(command.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_token_cannot_upgrade() {
    let s = stack().await;
    assert!(
        connect_async(format!("ws://{}/ws?token=nope", s.addr))
            .await
            .is_err()
    );
    assert!(connect_async(format!("ws://{}/ws", s.addr)).await.is_err());
    s.gateway.shutdown().await;
}

#[tokio::test]
async fn client_receives_init_then_history() {
    let s = stack().await;
    let mut socket = connect(s.addr, "tok-1").await;

    let init = next_of(&mut socket, "init").await;
    let sessions = init["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], "s1");

    let history = next_of(&mut socket, "allChatsHistoryData").await;
    assert_eq!(history["sessionId"], "s1");
    s.gateway.shutdown().await;
}

#[tokio::test]
async fn send_message_confirms_to_every_connection_of_the_user() {
    let s = stack().await;
    let mut first = connect(s.addr, "tok-1").await;
    let mut second = connect(s.addr, "tok-1").await;
    let mut stranger = connect(s.addr, "tok-2").await;
    next_of(&mut first, "init").await;
    next_of(&mut second, "init").await;
    next_of(&mut stranger, "init").await;

    send(
        &mut first,
        json!({
            "type": "sendMessage",
            "sessionId": "s1",
            "chatId": CHAT,
            "message": { "content": "hello there" },
            "tempId": 7
        }),
    )
    .await;

    let sent = next_of(&mut first, "messageSent").await;
    assert_eq!(sent["tempId"], 7);
    assert!(sent["finalId"].as_str().unwrap().contains("OUT"));
    assert_eq!(next_of(&mut second, "messageSent").await["tempId"], 7);
    assert_eq!(s.transport.sent_texts().await, vec!["hello there".to_string()]);

    // The other user only learns of it if the hub leaks across users.
    let leaked = tokio::time::timeout(Duration::from_millis(200), stranger.next()).await;
    assert!(leaked.is_err(), "frame leaked to another user: {leaked:?}");
    s.gateway.shutdown().await;
}

#[tokio::test]
async fn foreign_session_commands_are_refused() {
    let s = stack().await;
    let mut socket = connect(s.addr, "tok-2").await;
    next_of(&mut socket, "init").await;

    send(
        &mut socket,
        json!({
            "type": "sendMessage",
            "sessionId": "s1",
            "chatId": CHAT,
            "message": { "content": "not mine" }
        }),
    )
    .await;
    let error = next_of(&mut socket, "error").await;
    assert_eq!(error["message"], "Unauthorized for session s1");
    assert!(s.transport.sent_texts().await.is_empty());
    s.gateway.shutdown().await;
}

#[tokio::test]
async fn inbound_messages_reach_the_owner() {
    let s = stack().await;
    let mut socket = connect(s.addr, "tok-1").await;
    next_of(&mut socket, "init").await;

    let delivered = s
        .harness
        .transports
        .emit(
            &SessionId::from("s1"),
            TransportEvent::Message(TransportMessage {
                id: "in-1".into(),
                chat_id: CHAT.into(),
                kind: Some("chat".into()),
                body: Some("is the shop open?".into()),
                timestamp: 1_700_000_000,
                ..Default::default()
            }),
        )
        .await;
    assert!(delivered);

    let frame = next_of(&mut socket, "newMessage").await;
    assert_eq!(frame["sessionId"], "s1");
    assert_eq!(frame["chatId"], CHAT);
    assert_eq!(frame["message"]["content"], "is the shop open?");
    s.gateway.shutdown().await;
    s.engine.shutdown().await;
}

#[tokio::test]
async fn rest_send_uses_bearer_auth() {
    let s = stack().await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/v1/sessions/s1/messages", s.addr);

    let denied = client
        .post(&url)
        .json(&json!({ "chatId": CHAT, "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 401);

    let ok = client
        .post(&url)
        .bearer_auth("tok-1")
        .json(&json!({ "chatId": CHAT, "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().await.unwrap();
    assert!(body["id"].as_str().is_some());

    let health: Value = client
        .get(format!("http://{}/health", s.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_sessions"], 1);
    s.gateway.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_open_sockets() {
    let s = stack().await;
    let mut socket = connect(s.addr, "tok-1").await;
    next_of(&mut socket, "init").await;

    s.gateway.shutdown().await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert_eq!(closed, Ok(true));
}
