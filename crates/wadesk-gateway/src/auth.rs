// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token authentication for the gateway.
//!
//! Both transports resolve a token to a [`UserId`] through a [`TokenVerifier`]:
//! 1. REST routes read `Authorization: Bearer <token>` in [`auth_middleware`]
//! 2. the WebSocket route reads `?token=<token>` during the handshake
//!
//! An empty verifier rejects everything (fail-closed).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use wadesk_config::model::AuthConfig;
use wadesk_core::UserId;

/// Resolves a client token to the user it belongs to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<UserId>;
}

/// Fixed token → user map from configuration.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    pub fn new<I, T, U>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<UserId>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(t, u)| -> (String, UserId) { (t.into(), u.into()) })
                .filter(|(t, _)| !t.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.tokens.iter().map(|(t, u)| (t.as_str(), u.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("tokens", &format!("[{} redacted]", self.tokens.len()))
            .finish()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).cloned()
    }
}

/// The authenticated user, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware that validates the bearer token and records the caller.
pub async fn auth_middleware(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    match verifier.verify(token).await {
        Some(user) => {
            request.extensions_mut().insert(AuthUser(user));
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!("rejected bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
