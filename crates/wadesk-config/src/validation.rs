// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as the model allow-list, value ranges and known time zones.

use wadesk_core::settings::{MIN_MAX_TOKENS, is_allowed_model, is_valid_temperature};

use crate::diagnostic::ConfigError;
use crate::model::WadeskConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every error instead of failing fast.
pub fn validate_config(config: &WadeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.server.port == 0 {
        fail("server.port must be greater than 0".to_string());
    }

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    for (token, user) in &config.auth.tokens {
        if token.trim().is_empty() || user.trim().is_empty() {
            fail("auth.tokens entries must have a non-empty token and user id".to_string());
            break;
        }
    }

    if !is_allowed_model(&config.ai.model) {
        fail(format!(
            "ai.model `{}` is not one of the allowed models",
            config.ai.model
        ));
    }

    if !is_valid_temperature(config.ai.temperature) {
        fail(format!(
            "ai.temperature must be between 0 and 1, got {}",
            config.ai.temperature
        ));
    }

    if config.ai.max_tokens < MIN_MAX_TOKENS {
        fail(format!(
            "ai.max_tokens must be at least {MIN_MAX_TOKENS}, got {}",
            config.ai.max_tokens
        ));
    }

    if config.ai.timezone.parse::<chrono_tz::Tz>().is_err() {
        fail(format!("ai.timezone `{}` is not a known time zone", config.ai.timezone));
    }

    if config.openai.timeout_secs == 0 {
        fail("openai.timeout_secs must be greater than 0".to_string());
    }

    if config.transcription.timeout_secs == 0 {
        fail("transcription.timeout_secs must be greater than 0".to_string());
    }

    if config.sync.batch_size == 0 {
        fail("sync.batch_size must be greater than 0".to_string());
    }

    if config.sync.recent_chat_count == 0 {
        fail("sync.recent_chat_count must be greater than 0".to_string());
    }

    if config.sessions.event_buffer == 0 {
        fail("sessions.event_buffer must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
