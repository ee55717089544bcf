// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wadesk.toml` > `~/.config/wadesk/wadesk.toml` > `/etc/wadesk/wadesk.toml`
//! with environment variable overrides via `WADESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WadeskConfig;

/// Top-level sections, used to split env var names into `section.key`.
const SECTIONS: &[&str] = &[
    "server",
    "auth",
    "storage",
    "openai",
    "ai",
    "transcription",
    "media",
    "sync",
    "sessions",
    "bridge",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wadesk/wadesk.toml` (system-wide)
/// 3. `~/.config/wadesk/wadesk.toml` (user XDG config)
/// 4. `./wadesk.toml` (local directory)
/// 5. `WADESK_*` environment variables
pub fn load_config() -> Result<WadeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WadeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WadeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WadeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WadeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WadeskConfig::default()))
        .merge(Toml::file("/etc/wadesk/wadesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wadesk/wadesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wadesk.toml"))
        .merge(env_provider())
}

/// Map `WADESK_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `WADESK_SYNC_BATCH_SIZE` maps to `sync.batch_size`, not `sync.batch.size`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("WADESK_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    // Figment hands the key over before its own lowercasing pass.
    let key = key.to_ascii_lowercase();
    // Longest match first so `sessions_` is not read as `sessions` vs. a shorter prefix.
    let mut sections: Vec<&str> = SECTIONS.to_vec();
    sections.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for section in sections {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_first_section_underscore() {
        assert_eq!(map_env_key("sync_batch_size"), "sync.batch_size");
        assert_eq!(map_env_key("openai_api_key"), "openai.api_key");
        assert_eq!(map_env_key("ai_pause_window_secs"), "ai.pause_window_secs");
        assert_eq!(
            map_env_key("sessions_startup_stagger_secs"),
            "sessions.startup_stagger_secs"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_keys_arrive_uppercase() {
        assert_eq!(map_env_key("SYNC_BATCH_SIZE"), "sync.batch_size");
        assert_eq!(map_env_key("OPENAI_API_KEY"), "openai.api_key");
        assert_eq!(
            map_env_key("SESSIONS_STARTUP_STAGGER_SECS"),
            "sessions.startup_stagger_secs"
        );
    }
}
