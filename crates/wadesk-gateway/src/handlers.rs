// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /health and POST /v1/sessions/{session_id}/messages.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use wadesk_core::{SessionId, WadeskError};

use crate::auth::AuthUser;
use crate::server::GatewayState;

/// Request body for POST /v1/sessions/{session_id}/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub chat_id: String,
    pub content: String,
}

/// Response body for POST /v1/sessions/{session_id}/messages.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    /// Transport id of the sent message.
    pub id: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub connections: usize,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// HTTP status for an engine error.
pub fn status_for(error: &WadeskError) -> StatusCode {
    match error {
        WadeskError::Validation(_) => StatusCode::BAD_REQUEST,
        WadeskError::Unauthorized(_) => StatusCode::FORBIDDEN,
        WadeskError::NotFound(_) => StatusCode::NOT_FOUND,
        WadeskError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        WadeskError::TransportClosed(_) | WadeskError::Channel { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /v1/sessions/{session_id}/messages
///
/// Sends a text on behalf of one of the caller's sessions, records it and
/// fans it out like any other outbound message.
pub async fn post_session_message(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(session_id): Path<String>,
    Json(body): Json<SendRequest>,
) -> Response {
    let session = SessionId::from(session_id);
    if !state.ops.is_authorized(&user, &session).await {
        return error_response(
            StatusCode::FORBIDDEN,
            format!("Unauthorized for session {session}"),
        );
    }
    match state
        .ops
        .send_text(&user, &session, &body.chat_id, &body.content)
        .await
    {
        Ok(row) => (
            StatusCode::OK,
            Json(SendResponse {
                id: row.external_id.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(session_id = %session, error = %e, "send on behalf failed");
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.ops.sessions().active_count(),
        connections: state.hub.connection_count(),
    })
}
