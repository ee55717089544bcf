// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for UI clients.
//!
//! `GET /ws?token=<token>` upgrades once the token resolves to a user. The
//! client then receives an `init` snapshot followed by one
//! `allChatsHistoryData` per session, and after that every event fanned out
//! to its user plus the direct replies to its own commands.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use wadesk_core::UserId;

use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler. Unknown or missing tokens get 401.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    let token = params.token.unwrap_or_default();
    let Some(user) = (match token.as_str() {
        "" => None,
        token => state.verifier.verify(token).await,
    }) else {
        debug!("websocket upgrade rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Handle one client connection.
///
/// A writer task drains the connection's channel into the socket; the read
/// loop executes commands until the client leaves or the server shuts down.
async fn handle_socket(socket: WebSocket, state: GatewayState, user: UserId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (conn_id, reply, mut rx) = state.hub.register(&user);

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    state
        .commands
        .execute(&user, crate::commands::Command::RequestInitialData, &reply)
        .await;

    loop {
        let msg = tokio::select! {
            _ = state.cancel.cancelled() => break,
            msg = ws_receiver.next() => msg,
        };
        match msg {
            Some(Ok(Message::Text(text))) => {
                state.commands.handle_text(&user, text.as_str(), &reply).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(user_id = %user, error = %e, "websocket read failed");
                break;
            }
        }
    }

    state.hub.unregister(&user, conn_id);
    drop(reply);
    sender_task.abort();
}
