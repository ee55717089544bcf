// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Websocket event pump from the sidecar into a session's channel.

use futures::StreamExt;
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wadesk_core::{SessionId, TransportEvent, WadeskError};

use crate::protocol::parse_event;

/// Reported when the event stream dies without being cancelled.
pub const STREAM_LOST_STATE: &str = "DISCONNECTED";

pub type EventSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the session's event stream: `<events_url>?session=<id>`.
pub async fn connect(events_url: &str, session: &SessionId) -> Result<EventSocket, WadeskError> {
    let mut url = Url::parse(events_url)
        .map_err(|e| WadeskError::Config(format!("invalid bridge events url '{events_url}': {e}")))?;
    url.query_pairs_mut().append_pair("session", session.as_str());
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| WadeskError::Channel {
            message: format!("event stream connect failed: {e}"),
            source: Some(Box::new(e)),
        })?;
    debug!(session = %session, "bridge event stream connected");
    Ok(socket)
}

/// Forward decoded frames to `tx` until cancelled, the socket ends, or the
/// receiver is dropped.
///
/// An unexpected end of stream is reported once as [`STREAM_LOST_STATE`] so
/// the session is torn down instead of hanging.
pub async fn pump(
    mut socket: EventSocket,
    session: SessionId,
    tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(session = %session, "event pump cancelled");
                let _ = socket.close(None).await;
                return;
            }
            frame = socket.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => match parse_event(text.as_str()) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        debug!(session = %session, "session channel closed, stopping event pump");
                        return;
                    }
                }
                Ok(None) => debug!(session = %session, "ignoring unknown bridge event"),
                Err(e) => warn!(session = %session, error = %e, "malformed bridge event"),
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(session = %session, error = %e, "bridge event stream error");
                break;
            }
        }
    }

    if !cancel.is_cancelled() {
        info!(session = %session, "bridge event stream lost");
        let _ = tx
            .send(TransportEvent::StateChanged(STREAM_LOST_STATE.to_string()))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::TcpListener;

    /// Accept one websocket client, send `frames`, then close.
    async fn serve_frames(frames: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for f in frames {
                ws.send(Message::text(f)).await.unwrap();
            }
            let _ = ws.close(None).await;
        });
        format!("ws://{addr}/events")
    }

    #[tokio::test]
    async fn forwards_frames_then_reports_lost_stream() {
        let url = serve_frames(vec![
            r#"{"event":"state","data":"CONNECTED"}"#.into(),
            "garbage".into(),
            r#"{"event":"message","data":{"id":"m1","from":"1@c.us","type":"chat","body":"hi"}}"#.into(),
        ])
        .await;
        let session = SessionId::from("s1");
        let socket = connect(&url, &session).await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        pump(socket, session, tx, CancellationToken::new()).await;

        assert!(matches!(rx.recv().await, Some(TransportEvent::StateChanged(s)) if s == "CONNECTED"));
        assert!(matches!(rx.recv().await, Some(TransportEvent::Message(m)) if m.id == "m1"));
        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::StateChanged(s)) if s == STREAM_LOST_STATE
        ));
    }

    #[tokio::test]
    async fn cancelled_pump_reports_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Hold the connection open until the client goes away.
            while ws.next().await.is_some() {}
        });

        let session = SessionId::from("s2");
        let socket = connect(&format!("ws://{addr}/events"), &session).await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pump(socket, session, tx, cancel.clone()));
        cancel.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn connect_failure_is_channel_error() {
        let err = connect("ws://127.0.0.1:9/events", &SessionId::from("s")).await.unwrap_err();
        assert!(matches!(err, WadeskError::Channel { .. }));
    }
}
