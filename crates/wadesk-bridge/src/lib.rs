// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp automation sidecar client for wadesk.
//!
//! The sidecar owns the browser automation; this crate talks to it over HTTP
//! for operations and over a websocket for session events, and exposes both
//! through the [`TransportFactory`] / [`TransportClient`] traits.

pub mod client;
pub mod events;
pub mod protocol;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wadesk_config::model::BridgeConfig;
use wadesk_core::{SessionId, TransportClient, TransportEvent, TransportFactory, WadeskError};

pub use client::{BridgeClient, BridgeHttp};

/// Creates sidecar sessions and wires their event streams.
pub struct BridgeTransportFactory {
    http: BridgeHttp,
    events_url: String,
}

impl BridgeTransportFactory {
    pub fn new(config: &BridgeConfig) -> Result<Self, WadeskError> {
        let http = BridgeHttp::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self {
            http,
            events_url: config.resolved_events_url(),
        })
    }
}

#[async_trait]
impl TransportFactory for BridgeTransportFactory {
    async fn create(
        &self,
        session: &SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn TransportClient>, WadeskError> {
        // Subscribe first so the QR and state events of the launch are not missed.
        let socket = events::connect(&self.events_url, session).await?;

        let url = self.http.session_url(session, &["start"])?;
        self.http.request::<()>(Method::POST, url, None).await?;
        info!(session = %session, "bridge session started");

        let cancel = CancellationToken::new();
        tokio::spawn(events::pump(
            socket,
            session.clone(),
            events,
            cancel.clone(),
        ));
        Ok(Arc::new(BridgeClient::new(self.http.clone(), session.clone(), cancel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_starts_session_and_streams_events() {
        let http = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/shop-1/start"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&http)
            .await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::text(r#"{"event":"qr","data":{"qr":"QR1","attempt":1}}"#))
                .await
                .unwrap();
            while ws.next().await.is_some() {}
        });

        let factory = BridgeTransportFactory::new(&BridgeConfig {
            base_url: http.uri(),
            events_url: Some(format!("ws://{ws_addr}/events")),
            request_timeout_secs: 5,
        })
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let client = factory.create(&SessionId::from("shop-1"), tx).await.unwrap();
        match rx.recv().await {
            Some(TransportEvent::Qr { data, attempt }) => {
                assert_eq!(data, "QR1");
                assert_eq!(attempt, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        drop(client);
    }

    #[tokio::test]
    async fn create_fails_when_event_stream_is_unreachable() {
        let factory = BridgeTransportFactory::new(&BridgeConfig {
            base_url: "http://127.0.0.1:9".into(),
            events_url: Some("ws://127.0.0.1:9/events".into()),
            request_timeout_secs: 1,
        })
        .unwrap();
        let (tx, _rx) = mpsc::channel(1);
        assert!(factory.create(&SessionId::from("s"), tx).await.is_err());
    }
}
