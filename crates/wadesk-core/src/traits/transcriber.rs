// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech-to-text trait.

use std::path::Path;

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait Transcriber: PluginAdapter {
    /// Transcribe `audio`, using `work_dir` for intermediate output.
    ///
    /// Never fails: any error, timeout or empty output yields `""`.
    async fn transcribe(&self, audio: &Path, work_dir: &Path, correlation_id: &str) -> String;
}
