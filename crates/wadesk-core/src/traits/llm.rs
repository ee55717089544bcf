// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider trait for chat completions with tool calling.

use async_trait::async_trait;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::WadeskError;
use crate::traits::adapter::PluginAdapter;

/// A chat-completions backend.
///
/// Errors are classified so callers can pick a user-facing fallback:
/// [`WadeskError::MissingCredentials`], [`WadeskError::Timeout`],
/// [`WadeskError::Network`] and [`WadeskError::Provider`].
#[async_trait]
pub trait LlmProvider: PluginAdapter {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, WadeskError>;
}
