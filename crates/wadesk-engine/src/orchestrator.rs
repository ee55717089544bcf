// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One assistant turn: context, completion, tool dispatch and the reply.
//!
//! Failures never drop the turn. Provider errors become a short apology that
//! is sent like any other reply, and a delivered tool confirmation always
//! wins over the model's free text.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, info, warn};

use wadesk_core::chat::{ChatRequest, ChatResponse};
use wadesk_core::{TransportClient, WadeskError};

use crate::context::{PromptContext, build_context};
use crate::deps::{ChatTarget, EngineDeps};
use crate::publish::send_and_record;
use crate::tools::{ToolContext, ToolRegistry, unknown_tool_reply};

pub const NO_CONTEXT_REPLY: &str = "מצטערת, אין לי הקשר לשיחה.";
pub const INSUFFICIENT_CONTEXT_REPLY: &str = "אני צריכה קצת יותר מידע כדי לענות.";
pub const EMPTY_CHOICE_REPLY: &str = "משהו השתבש בתשובה שלי.";

/// What happened during one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub tool_calls: usize,
    pub confirmations_sent: usize,
    pub text_sent: bool,
    pub text_suppressed: bool,
}

/// Reply text for a failed completion.
pub fn failure_reply(error: &WadeskError) -> String {
    match error {
        WadeskError::MissingCredentials(_) => "שגיאה: מפתח OpenAI חסר.".to_string(),
        WadeskError::Timeout { .. } => "שירות ה-AI לא ענה בזמן.".to_string(),
        WadeskError::Network { .. } => "בעיית תקשורת עם שירות ה-AI.".to_string(),
        WadeskError::Provider { message, .. } => format!("שגיאת AI: {message}"),
        _ => "קושי טכני כרגע.".to_string(),
    }
}

/// Parse the configured timezone, falling back to Israel time.
pub fn resolve_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!(timezone = name, "unknown timezone, using Asia/Jerusalem");
        chrono_tz::Asia::Jerusalem
    })
}

pub struct AiOrchestrator {
    deps: EngineDeps,
    tools: Arc<ToolRegistry>,
    tz: Tz,
}

impl AiOrchestrator {
    pub fn new(deps: EngineDeps, tools: Arc<ToolRegistry>) -> Self {
        let tz = resolve_timezone(&deps.config.ai.timezone);
        Self { deps, tools, tz }
    }

    /// Answer `text` in the chat described by `target`.
    pub async fn respond(
        &self,
        transport: &dyn TransportClient,
        target: &ChatTarget,
        text: &str,
    ) -> TurnReport {
        let deps = &self.deps;
        let settings = deps.settings_for(&target.user).await;
        let history = deps
            .store
            .recent_messages(
                &target.user,
                &target.session,
                &target.chat_id,
                deps.config.openai.history_limit,
            )
            .await
            .unwrap_or_else(|e| {
                warn!(chat_id = %target.chat_id, error = %e, "failed to load history");
                Vec::new()
            });

        let context = build_context(
            &history,
            text,
            &settings,
            Utc::now(),
            self.tz,
            deps.config.openai.history_limit,
        );
        let response = match context {
            PromptContext::NoHistory => ChatResponse::text(NO_CONTEXT_REPLY),
            PromptContext::InsufficientContext => ChatResponse::text(INSUFFICIENT_CONTEXT_REPLY),
            PromptContext::Ready(messages) => {
                let request = ChatRequest {
                    model: settings.model.clone(),
                    messages,
                    tools: self.tools.definitions(),
                    temperature: settings.temperature,
                    max_tokens: settings.max_tokens,
                };
                match deps.llm.chat(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(chat_id = %target.chat_id, error = %e, "completion failed");
                        ChatResponse::text(failure_reply(&e))
                    }
                }
            }
        };

        let mut report = TurnReport {
            tool_calls: response.tool_calls.len(),
            ..TurnReport::default()
        };
        // `None` means the completion carried no choice at all. Empty content
        // next to no tool calls is a deliberate silence.
        let free_text = match response.text.as_deref() {
            None if response.tool_calls.is_empty() => Some(EMPTY_CHOICE_REPLY.to_string()),
            None => None,
            Some(text) => Some(text.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        };

        let ctx = ToolContext {
            target,
            store: deps.store.as_ref(),
            fanout: deps.fanout.as_ref(),
        };
        for call in &response.tool_calls {
            let args: Value = match serde_json::from_str(&call.arguments) {
                Ok(args) => args,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "unparseable tool arguments, skipping");
                    continue;
                }
            };
            let reply = match self.tools.get(&call.name) {
                Some(tool) => {
                    let outcome = tool.invoke(&ctx, args).await;
                    debug!(tool = %call.name, success = outcome.success, "tool invoked");
                    outcome.reply
                }
                None => {
                    warn!(tool = %call.name, "model requested an unknown tool");
                    unknown_tool_reply(&call.name)
                }
            };
            match send_and_record(deps, transport, target, &reply).await {
                Ok(_) => report.confirmations_sent += 1,
                Err(e) => {
                    warn!(chat_id = %target.chat_id, error = %e, "failed to send tool confirmation")
                }
            }
        }

        let Some(text) = free_text else {
            return report;
        };
        if report.confirmations_sent > 0 {
            info!(chat_id = %target.chat_id, "confirmation already sent, dropping free text");
            report.text_suppressed = true;
            return report;
        }

        tokio::time::sleep(Duration::from_secs(u64::from(settings.delay_seconds))).await;
        match send_and_record(deps, transport, target, &text).await {
            Ok(_) => report.text_sent = true,
            Err(e) => warn!(chat_id = %target.chat_id, error = %e, "failed to send reply"),
        }
        report
    }
}
