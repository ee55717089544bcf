// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! `MockLlm` implements `LlmProvider` with pre-configured results and
//! captures every request for assertions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wadesk_core::chat::{ChatRequest, ChatResponse};
use wadesk_core::{AdapterType, HealthStatus, LlmProvider, PluginAdapter, WadeskError};

/// Results are popped from a FIFO queue. When the queue is empty a
/// "mock response" text is returned.
pub struct MockLlm {
    responses: Arc<Mutex<VecDeque<Result<ChatResponse, WadeskError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_responses(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_response(&self, response: ChatResponse) {
        self.responses.lock().await.push_back(Ok(response));
    }

    pub async fn push_error(&self, error: WadeskError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockLlm {
    fn name(&self) -> &str {
        "mock-llm"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Llm
    }

    async fn health_check(&self) -> Result<HealthStatus, WadeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WadeskError> {
        Ok(())
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, WadeskError> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ChatResponse::text("mock response")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadesk_core::chat::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            tools: vec![],
            temperature: 0.4,
            max_tokens: 300,
        }
    }

    #[tokio::test]
    async fn queued_then_default() {
        let llm = MockLlm::with_responses(vec![ChatResponse::text("first")]);
        llm.push_error(WadeskError::Timeout {
            duration: std::time::Duration::from_secs(45),
        })
        .await;

        assert_eq!(llm.chat(request()).await.unwrap().text.as_deref(), Some("first"));
        assert!(matches!(llm.chat(request()).await, Err(WadeskError::Timeout { .. })));
        assert_eq!(
            llm.chat(request()).await.unwrap().text.as_deref(),
            Some("mock response")
        );
        assert_eq!(llm.call_count().await, 3);
    }
}
