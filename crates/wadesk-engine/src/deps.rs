// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared collaborators handed to every engine component.

use std::sync::Arc;

use tracing::warn;
use wadesk_config::model::WadeskConfig;
use wadesk_core::settings::AiSettings;
use wadesk_core::{FanOut, LlmProvider, PersistenceGateway, SessionId, Transcriber, UserId};

use crate::ai_control::AiControl;

/// Everything the engine talks to. Cheap to clone.
#[derive(Clone)]
pub struct EngineDeps {
    pub store: Arc<dyn PersistenceGateway>,
    pub llm: Arc<dyn LlmProvider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub fanout: Arc<dyn FanOut>,
    pub ai: Arc<AiControl>,
    pub config: Arc<WadeskConfig>,
}

impl EngineDeps {
    /// Effective AI settings of `user`. Storage failures fall back to the configured defaults.
    pub async fn settings_for(&self, user: &UserId) -> AiSettings {
        let defaults = self.config.ai.defaults();
        match self.store.ai_settings(user).await {
            Ok(Some(row)) => row.resolve(&defaults),
            Ok(None) => defaults,
            Err(e) => {
                warn!(user_id = %user, error = %e, "failed to load AI settings, using defaults");
                defaults
            }
        }
    }
}

/// One customer conversation inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget {
    pub user: UserId,
    pub session: SessionId,
    pub chat_id: String,
    /// The chat id without its `@c.us` suffix.
    pub phone: String,
}

impl ChatTarget {
    pub fn new(user: UserId, session: SessionId, chat_id: impl Into<String>) -> Self {
        let chat_id = chat_id.into();
        let phone = wadesk_core::phone::phone_from_chat_id(&chat_id).to_string();
        Self {
            user,
            session,
            chat_id,
            phone,
        }
    }
}
