// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat completions provider for wadesk.
//!
//! Implements [`LlmProvider`] with function tools and `tool_choice: "auto"`.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wadesk_config::model::OpenAiConfig;
use wadesk_core::chat::{ChatRequest, ChatResponse, ToolCall};
use wadesk_core::{AdapterType, HealthStatus, LlmProvider, PluginAdapter, WadeskError};

use crate::client::OpenAiClient;
use crate::types::{ApiFunction, ApiMessage, ApiTool, CompletionRequest, CompletionResponse};

/// Chat completions provider.
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var. Without a
/// key the provider still constructs; every call then fails with
/// [`WadeskError::MissingCredentials`] so the caller can answer with a fallback.
pub struct OpenAiProvider {
    client: Option<OpenAiClient>,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, WadeskError> {
        let client = match resolve_api_key(&config.api_key) {
            Some(key) => {
                let client = OpenAiClient::new(
                    &key,
                    &config.base_url,
                    Duration::from_secs(config.timeout_secs),
                )?;
                info!(base_url = %config.base_url, "OpenAI provider initialized");
                Some(client)
            }
            None => {
                warn!("OpenAI API key not configured; AI replies will use the fallback text");
                None
            }
        };
        Ok(Self { client })
    }

    pub fn has_credentials(&self) -> bool {
        self.client.is_some()
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Llm
    }

    async fn health_check(&self) -> Result<HealthStatus, WadeskError> {
        // No API call here; health checks must not consume tokens.
        if self.client.is_some() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("API key missing".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), WadeskError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, WadeskError> {
        let client = self.client.as_ref().ok_or_else(|| {
            WadeskError::MissingCredentials(
                "set openai.api_key in config or OPENAI_API_KEY environment variable".into(),
            )
        })?;
        let response = client.complete(&to_completion_request(request)).await?;
        Ok(from_completion_response(response))
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Option<String> {
    if let Some(key) = config_key
        && !key.trim().is_empty()
    {
        return Some(key.clone());
    }
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

fn to_completion_request(request: ChatRequest) -> CompletionRequest {
    let tools: Vec<ApiTool> = request
        .tools
        .into_iter()
        .map(|t| ApiTool {
            tool_type: "function".into(),
            function: ApiFunction {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect();
    let (tools, tool_choice) = if tools.is_empty() {
        (None, None)
    } else {
        (Some(tools), Some("auto".to_string()))
    };

    CompletionRequest {
        model: request.model,
        messages: request
            .messages
            .into_iter()
            .map(|m| ApiMessage {
                role: m.role,
                content: m.content,
            })
            .collect(),
        tools,
        tool_choice,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

/// Take the first choice. No choice (or a choice without a message) yields
/// `text: None` with no tool calls; a message with null content yields `Some("")`.
fn from_completion_response(response: CompletionResponse) -> ChatResponse {
    let Some(message) = response.choices.into_iter().next().and_then(|c| c.message) else {
        return ChatResponse::default();
    };
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolCall {
            id: c.id,
            name: c.function.name,
            arguments: c.function.arguments,
        })
        .collect();
    ChatResponse {
        text: Some(message.content.unwrap_or_default()),
        tool_calls,
    }
}
