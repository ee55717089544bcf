// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use wadesk_core::{FanOut, WadeskError};
use wadesk_engine::ChatOps;

use crate::auth::{TokenVerifier, auth_middleware};
use crate::commands::CommandHandler;
use crate::handlers;
use crate::hub::ConnectionHub;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub ops: Arc<ChatOps>,
    /// Open UI connections; also the engine's fan-out.
    pub hub: Arc<ConnectionHub>,
    pub commands: Arc<CommandHandler>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Cancelled on shutdown; closes the listener and every socket loop.
    pub cancel: CancellationToken,
}

impl GatewayState {
    pub fn new(
        ops: Arc<ChatOps>,
        hub: Arc<ConnectionHub>,
        verifier: Arc<dyn TokenVerifier>,
        cancel: CancellationToken,
    ) -> Self {
        let fanout: Arc<dyn FanOut> = hub.clone();
        let commands = Arc::new(CommandHandler::new(Arc::clone(&ops), fanout));
        Self {
            ops,
            hub,
            commands,
            verifier,
            start_time: Instant::now(),
            cancel,
        }
    }
}

/// Build the gateway router.
///
/// - GET /health (public)
/// - POST /v1/sessions/{session_id}/messages (bearer auth)
/// - GET /ws (token checked during the handshake)
pub fn router(state: GatewayState) -> Router {
    let verifier = Arc::clone(&state.verifier);

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/sessions/{session_id}/messages",
            post(handlers::post_session_message),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            verifier,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Serve on a bound listener until the state's token is cancelled.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<(), WadeskError> {
    let cancel = state.cancel.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| WadeskError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wadesk_core::TransportFactory;
    use wadesk_engine::{AiControl, Engine, EngineDeps};
    use wadesk_test_utils::TestHarness;

    use crate::auth::StaticTokenVerifier;

    async fn state() -> (TestHarness, GatewayState) {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.register("s1", "u1").await.unwrap();
        let hub = Arc::new(ConnectionHub::new());
        let cancel = CancellationToken::new();
        let deps = EngineDeps {
            store: harness.storage.clone(),
            llm: harness.llm.clone(),
            transcriber: harness.transcriber.clone(),
            fanout: hub.clone(),
            ai: Arc::new(AiControl::default()),
            config: Arc::new(harness.config.clone()),
        };
        let factory: Arc<dyn TransportFactory> = harness.transports.clone();
        let engine = Engine::new(deps, factory, cancel.clone());
        let verifier: Arc<dyn TokenVerifier> =
            Arc::new(StaticTokenVerifier::new([("tok-1", "u1"), ("tok-2", "u2")]));
        let state = GatewayState::new(Arc::clone(&engine.ops), hub, verifier, cancel);
        (harness, state)
    }

    fn send_request(token: Option<&str>, session: &str, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/v1/sessions/{session}/messages"))
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_h, state) = state().await;
        let resp = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn send_requires_a_bearer_token() {
        let (_h, state) = state().await;
        let resp = router(state)
            .oneshot(send_request(None, "s1", r#"{"chatId":"1@c.us","content":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn send_rejects_foreign_sessions() {
        let (_h, state) = state().await;
        let resp = router(state)
            .oneshot(send_request(
                Some("tok-2"),
                "s1",
                r#"{"chatId":"1@c.us","content":"hi"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn send_to_inactive_session_is_not_found() {
        let (_h, state) = state().await;
        let resp = router(state)
            .oneshot(send_request(
                Some("tok-1"),
                "s1",
                r#"{"chatId":"1@c.us","content":"hi"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_without_token_is_rejected() {
        let (_h, state) = state().await;
        let resp = router(state)
            .oneshot(
                Request::get("/ws")
                    .header("connection", "upgrade")
                    .header("upgrade", "websocket")
                    .header("sec-websocket-version", "13")
                    .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
