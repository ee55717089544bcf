// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user AI reply settings: defaults, read-side fallback and write-side validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WadeskError;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful WhatsApp assistant.";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_DELAY_SECONDS: u32 = 5;
pub const MIN_MAX_TOKENS: u32 = 50;

/// Models a user may select.
pub const ALLOWED_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1-mini-2025-04-14",
    "gpt-4.1-nano-2025-04-14",
];

pub fn is_allowed_model(model: &str) -> bool {
    ALLOWED_MODELS.contains(&model)
}

pub fn is_valid_temperature(t: f64) -> bool {
    t.is_finite() && (0.0..=1.0).contains(&t)
}

/// Effective settings used for one LLM turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(rename = "ai_instructions", alias = "ai_prompt")]
    pub instructions: String,
    #[serde(rename = "ai_model")]
    pub model: String,
    #[serde(rename = "ai_temperature")]
    pub temperature: f64,
    #[serde(rename = "ai_max_tokens")]
    pub max_tokens: u32,
    #[serde(rename = "ai_delay_seconds")]
    pub delay_seconds: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            delay_seconds: DEFAULT_DELAY_SECONDS,
        }
    }
}

/// The raw settings row; every column may be missing or hold garbage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredAiSettings {
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub delay_seconds: Option<i64>,
}

impl StoredAiSettings {
    /// Resolve against `defaults`, falling back field by field.
    pub fn resolve(&self, defaults: &AiSettings) -> AiSettings {
        let instructions = self
            .instructions
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| defaults.instructions.clone(), str::to_string);
        let model = self
            .model
            .as_deref()
            .filter(|m| is_allowed_model(m))
            .map_or_else(|| defaults.model.clone(), str::to_string);
        let temperature = self
            .temperature
            .filter(|t| is_valid_temperature(*t))
            .unwrap_or(defaults.temperature);
        let max_tokens = self
            .max_tokens
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v >= MIN_MAX_TOKENS)
            .unwrap_or(defaults.max_tokens);
        let delay_seconds = self
            .delay_seconds
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(defaults.delay_seconds);
        AiSettings {
            instructions,
            model,
            temperature,
            max_tokens,
            delay_seconds,
        }
    }
}

/// A validated partial update. `instructions: Some(None)` stores NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiSettingsUpdate {
    pub instructions: Option<Option<String>>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub delay_seconds: Option<u32>,
}

impl AiSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_none()
            && self.model.is_none()
            && self.temperature.is_none()
            && self.max_tokens.is_none()
            && self.delay_seconds.is_none()
    }

    /// Validate a client payload field by field.
    ///
    /// Invalid fields are skipped and reported in the returned warnings;
    /// only a non-object payload is an error.
    pub fn from_value(value: &Value) -> Result<(Self, Vec<String>), WadeskError> {
        let obj = value
            .as_object()
            .ok_or_else(|| WadeskError::Validation("Invalid settings data.".into()))?;
        let mut update = Self::default();
        let mut warnings = Vec::new();

        if let Some(raw) = obj.get("ai_instructions") {
            update.instructions = Some(
                raw.as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(raw) = obj.get("ai_model") {
            match raw.as_str().filter(|m| is_allowed_model(m)) {
                Some(m) => update.model = Some(m.to_string()),
                None => warnings.push(format!("invalid model skipped: {raw}")),
            }
        }
        if let Some(raw) = obj.get("ai_temperature") {
            match lenient_f64(raw).filter(|t| is_valid_temperature(*t)) {
                Some(t) => update.temperature = Some(t),
                None => warnings.push(format!("invalid temperature skipped: {raw}")),
            }
        }
        if let Some(raw) = obj.get("ai_max_tokens") {
            match lenient_u32(raw).filter(|v| *v >= MIN_MAX_TOKENS) {
                Some(v) => update.max_tokens = Some(v),
                None => warnings.push(format!("invalid max_tokens skipped: {raw}")),
            }
        }
        if let Some(raw) = obj.get("ai_delay_seconds") {
            match lenient_u32(raw) {
                Some(v) => update.delay_seconds = Some(v),
                None => warnings.push(format!("invalid delay_seconds skipped: {raw}")),
            }
        }
        Ok((update, warnings))
    }
}

fn lenient_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
