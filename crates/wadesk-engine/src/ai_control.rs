// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide AI switches: the owner-activity pause and the global toggle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use tracing::info;
use wadesk_config::model::AiConfig;

/// Shared via `Arc`; all reads and writes are lock-free.
#[derive(Debug)]
pub struct AiControl {
    /// Epoch ms until which the assistant stays silent; 0 when never armed.
    paused_until_ms: AtomicI64,
    enabled: AtomicBool,
    pause_window: Duration,
}

impl AiControl {
    pub fn new(enabled: bool, pause_window: Duration) -> Self {
        Self {
            paused_until_ms: AtomicI64::new(0),
            enabled: AtomicBool::new(enabled),
            pause_window,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(config.enabled, Duration::from_secs(config.pause_window_secs))
    }

    /// Silence the assistant for one pause window starting at `now_ms`.
    pub fn arm_pause(&self, now_ms: i64) -> i64 {
        let until = now_ms + self.pause_window.as_millis() as i64;
        self.paused_until_ms.store(until, Ordering::SeqCst);
        info!(paused_until_ms = until, "owner activity, AI paused");
        until
    }

    pub fn is_paused(&self, now_ms: i64) -> bool {
        now_ms < self.paused_until_ms.load(Ordering::SeqCst)
    }

    pub fn paused_until(&self) -> Option<i64> {
        match self.paused_until_ms.load(Ordering::SeqCst) {
            0 => None,
            v => Some(v),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "AI global state changed");
    }
}

impl Default for AiControl {
    fn default() -> Self {
        Self::from_config(&AiConfig::default())
    }
}
