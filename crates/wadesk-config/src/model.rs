// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the wadesk session engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wadesk_core::settings;

/// Top-level wadesk configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WadeskConfig {
    /// HTTP/WebSocket listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Static UI token table.
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// OpenAI-compatible completions endpoint.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Default AI reply behavior, used where a user has no stored settings.
    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub media: MediaConfig,

    /// Initial history synchronization.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Session orchestration.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// WhatsApp automation sidecar.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Token verification for UI clients.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Bearer token → user id.
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("wadesk").join("wadesk.db"))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wadesk.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,

    /// Stored messages included as conversation context.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            timeout_secs: default_openai_timeout(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_timeout() -> u64 {
    45
}

fn default_history_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    #[serde(default = "default_instructions")]
    pub instructions: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,

    /// Wait before sending a free-text reply.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u32,

    /// How long an owner's own message silences the assistant.
    #[serde(default = "default_pause_window")]
    pub pause_window_secs: u64,

    /// IANA zone used for `{current_time_israel}` in instructions.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Initial value of the global AI toggle.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            instructions: default_instructions(),
            model: default_ai_model(),
            temperature: default_temperature(),
            max_tokens: default_ai_max_tokens(),
            delay_seconds: default_delay_seconds(),
            pause_window_secs: default_pause_window(),
            timezone: default_timezone(),
            enabled: default_enabled(),
        }
    }
}

impl AiConfig {
    /// Defaults applied to user settings that are missing or invalid.
    pub fn defaults(&self) -> settings::AiSettings {
        settings::AiSettings {
            instructions: self.instructions.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            delay_seconds: self.delay_seconds,
        }
    }
}

fn default_instructions() -> String {
    settings::DEFAULT_INSTRUCTIONS.to_string()
}

fn default_ai_model() -> String {
    settings::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    settings::DEFAULT_TEMPERATURE
}

fn default_ai_max_tokens() -> u32 {
    settings::DEFAULT_MAX_TOKENS
}

fn default_delay_seconds() -> u32 {
    settings::DEFAULT_DELAY_SECONDS
}

fn default_pause_window() -> u64 {
    300
}

fn default_timezone() -> String {
    "Asia/Jerusalem".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    /// Speech-to-text executable.
    #[serde(default = "default_whisper_command")]
    pub command: String,

    #[serde(default = "default_whisper_model")]
    pub model: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// The process is killed after this long.
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,

    /// Delay before a job directory is removed.
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_secs: u64,

    /// Parent of per-job directories.
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: String,

    /// Leftover job directories older than this are swept.
    #[serde(default = "default_recordings_retention")]
    pub retention_hours: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            command: default_whisper_command(),
            model: default_whisper_model(),
            language: default_language(),
            timeout_secs: default_transcription_timeout(),
            cleanup_delay_secs: default_cleanup_delay(),
            recordings_dir: default_recordings_dir(),
            retention_hours: default_recordings_retention(),
        }
    }
}

fn default_whisper_command() -> String {
    "whisper".to_string()
}

fn default_whisper_model() -> String {
    "large".to_string()
}

fn default_language() -> String {
    "he".to_string()
}

fn default_transcription_timeout() -> u64 {
    300
}

fn default_cleanup_delay() -> u64 {
    25
}

fn default_recordings_dir() -> String {
    "recordings".to_string()
}

fn default_recordings_retention() -> u64 {
    24
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Where inbound media files are written.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    #[serde(default = "default_uploads_retention")]
    pub retention_hours: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            retention_hours: default_uploads_retention(),
        }
    }
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

fn default_uploads_retention() -> u64 {
    48
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Chats (most recently active first) whose cached messages are imported.
    #[serde(default = "default_recent_chat_count")]
    pub recent_chat_count: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between per-chat fetches.
    #[serde(default = "default_chat_delay_ms")]
    pub chat_delay_ms: u64,

    /// Wait after CONNECTED before starting the initial sync.
    #[serde(default = "default_connect_delay")]
    pub connect_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recent_chat_count: default_recent_chat_count(),
            batch_size: default_batch_size(),
            chat_delay_ms: default_chat_delay_ms(),
            connect_delay_secs: default_connect_delay(),
        }
    }
}

fn default_recent_chat_count() -> usize {
    50
}

fn default_batch_size() -> usize {
    50
}

fn default_chat_delay_ms() -> u64 {
    200
}

fn default_connect_delay() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Delay between restoring registered sessions at startup.
    #[serde(default = "default_startup_stagger")]
    pub startup_stagger_secs: u64,

    /// Hard exit deadline after a shutdown signal.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Capacity of each session's transport event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            startup_stagger_secs: default_startup_stagger(),
            shutdown_grace_secs: default_shutdown_grace(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_startup_stagger() -> u64 {
    15
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_event_buffer() -> usize {
    512
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// HTTP base of the automation sidecar.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    /// WebSocket event stream. Derived from `base_url` when unset.
    #[serde(default)]
    pub events_url: Option<String>,

    #[serde(default = "default_bridge_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            events_url: None,
            request_timeout_secs: default_bridge_timeout(),
        }
    }
}

impl BridgeConfig {
    /// `events_url`, or `base_url` with a ws scheme and `/events` appended.
    pub fn resolved_events_url(&self) -> String {
        if let Some(url) = &self.events_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}/events")
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3100".to_string()
}

fn default_bridge_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_defaults_match_core_defaults() {
        assert_eq!(AiConfig::default().defaults(), settings::AiSettings::default());
    }

    #[test]
    fn events_url_is_derived_from_base() {
        let bridge = BridgeConfig {
            base_url: "https://bridge.local:8443/".into(),
            ..BridgeConfig::default()
        };
        assert_eq!(bridge.resolved_events_url(), "wss://bridge.local:8443/events");

        let explicit = BridgeConfig {
            events_url: Some("ws://other/stream".into()),
            ..BridgeConfig::default()
        };
        assert_eq!(explicit.resolved_events_url(), "ws://other/stream");
    }
}
