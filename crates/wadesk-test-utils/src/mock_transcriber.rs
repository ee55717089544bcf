// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transcriber returning a fixed transcript.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wadesk_core::{AdapterType, HealthStatus, PluginAdapter, Transcriber, WadeskError};

pub struct MockTranscriber {
    transcript: Arc<Mutex<String>>,
    calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl MockTranscriber {
    /// `transcript` is returned for every call; `""` simulates a failed transcription.
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: Arc::new(Mutex::new(transcript.to_string())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn set_transcript(&self, transcript: &str) {
        *self.transcript.lock().await = transcript.to_string();
    }

    /// `(audio path, correlation id)` per call.
    pub async fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockTranscriber {
    fn name(&self) -> &str {
        "mock-transcriber"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcriber
    }

    async fn health_check(&self) -> Result<HealthStatus, WadeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WadeskError> {
        Ok(())
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &Path, _work_dir: &Path, correlation_id: &str) -> String {
        self.calls
            .lock()
            .await
            .push((audio.to_path_buf(), correlation_id.to_string()));
        self.transcript.lock().await.clone()
    }
}
