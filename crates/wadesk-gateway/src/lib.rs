// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for UI clients.
//!
//! UI clients connect over `/ws`, receive the initial snapshot and every
//! realtime event for their user, and send commands back on the same socket.
//! The [`ConnectionHub`] doubles as the engine's [`wadesk_core::FanOut`].

pub mod auth;
pub mod commands;
pub mod handlers;
pub mod hub;
pub mod server;
pub mod ws;

use std::net::SocketAddr;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use wadesk_config::model::ServerConfig;
use wadesk_core::{HealthStatus, WadeskError};

pub use auth::{StaticTokenVerifier, TokenVerifier};
pub use commands::{Command, CommandHandler};
pub use hub::ConnectionHub;
pub use server::{GatewayState, router};

/// Runs the axum server as a background task.
pub struct Gateway {
    config: ServerConfig,
    state: GatewayState,
    server_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    pub fn new(config: ServerConfig, state: GatewayState) -> Self {
        Self {
            config,
            state,
            server_handle: Mutex::new(None),
        }
    }

    /// Bind and start serving, returning the bound address. Bind failures
    /// are returned, later server errors are logged.
    pub async fn start(&self) -> Result<SocketAddr, WadeskError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WadeskError::Channel {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;
        let local = listener.local_addr().map_err(|e| WadeskError::Channel {
            message: format!("gateway listener has no address: {e}"),
            source: Some(Box::new(e)),
        })?;
        tracing::info!("gateway listening on {local}");

        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(listener, state).await {
                tracing::error!("gateway server error: {e}");
            }
        });
        *self.server_handle.lock().await = Some(handle);
        Ok(local)
    }

    pub async fn health_check(&self) -> HealthStatus {
        match self.server_handle.lock().await.as_ref() {
            Some(h) if !h.is_finished() => HealthStatus::Healthy,
            Some(_) => HealthStatus::Unhealthy("server stopped".to_string()),
            None => HealthStatus::Unhealthy("server not started".to_string()),
        }
    }

    /// Stop accepting connections, drop every client and wait for the server task.
    pub async fn shutdown(&self) {
        self.state.cancel.cancel();
        self.state.hub.close_all();
        if let Some(handle) = self.server_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}
