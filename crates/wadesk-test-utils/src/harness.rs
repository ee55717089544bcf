// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness bundling a temp SQLite store with mock collaborators.
//!
//! ```ignore
//! let harness = TestHarness::builder()
//!     .with_responses(vec![ChatResponse::text("hi there")])
//!     .build()
//!     .await?;
//! harness.register("shop-1", "u1").await?;
//! ```

use std::sync::Arc;

use tempfile::TempDir;

use wadesk_config::model::WadeskConfig;
use wadesk_core::chat::ChatResponse;
use wadesk_core::{PersistenceGateway, SessionId, UserId, WadeskError};
use wadesk_storage::SqliteStorage;

use crate::fanout::RecordingFanOut;
use crate::mock_llm::MockLlm;
use crate::mock_transcriber::MockTranscriber;
use crate::mock_transport::MockTransportFactory;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    responses: Vec<ChatResponse>,
    transcript: String,
    config: Option<WadeskConfig>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            transcript: "mock transcript".to_string(),
            config: None,
        }
    }

    /// Queue LLM responses, returned in order.
    pub fn with_responses(mut self, responses: Vec<ChatResponse>) -> Self {
        self.responses = responses;
        self
    }

    /// Transcript returned by the mock transcriber; `""` simulates failure.
    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.transcript = transcript.to_string();
        self
    }

    /// Start from `config` instead of the zero-delay test config. Paths are
    /// still redirected into the harness temp dir.
    pub fn with_config(mut self, config: WadeskConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<TestHarness, WadeskError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| WadeskError::Internal(format!("failed to create temp dir: {e}")))?;
        let root = temp_dir.path();

        let mut config = self.config.unwrap_or_else(test_config);
        config.storage.database_path = root.join("wadesk.db").to_string_lossy().into_owned();
        config.transcription.recordings_dir =
            root.join("recordings").to_string_lossy().into_owned();
        config.media.uploads_dir = root.join("uploads").to_string_lossy().into_owned();

        for dir in [
            &config.transcription.recordings_dir,
            &config.media.uploads_dir,
        ] {
            std::fs::create_dir_all(dir)
                .map_err(|e| WadeskError::Internal(format!("failed to create {dir}: {e}")))?;
        }

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        Ok(TestHarness {
            config,
            storage,
            llm: Arc::new(MockLlm::with_responses(self.responses)),
            transcriber: Arc::new(MockTranscriber::new(&self.transcript)),
            transports: Arc::new(MockTransportFactory::new()),
            fanout: Arc::new(RecordingFanOut::new()),
            _temp_dir: temp_dir,
        })
    }
}

/// Temp store plus mocks. The temp dir lives as long as the harness.
pub struct TestHarness {
    pub config: WadeskConfig,
    pub storage: Arc<SqliteStorage>,
    pub llm: Arc<MockLlm>,
    pub transcriber: Arc<MockTranscriber>,
    pub transports: Arc<MockTransportFactory>,
    pub fanout: Arc<RecordingFanOut>,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register `session` as owned by `user`.
    pub async fn register(&self, session: &str, user: &str) -> Result<(), WadeskError> {
        self.storage
            .register_session(&SessionId::from(session), &UserId::from(user))
            .await
    }
}

/// Default config with every delay zeroed so tests run instantly.
pub fn test_config() -> WadeskConfig {
    let mut config = WadeskConfig::default();
    config.ai.delay_seconds = 0;
    config.sync.chat_delay_ms = 0;
    config.sync.connect_delay_secs = 0;
    config.sessions.startup_stagger_secs = 0;
    config.transcription.cleanup_delay_secs = 0;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadesk_core::Label;

    #[tokio::test]
    async fn harness_builds_with_temp_store() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.register("s1", "u1").await.unwrap();

        let owner = harness
            .storage
            .session_owner(&SessionId::from("s1"))
            .await
            .unwrap();
        assert_eq!(owner, Some(UserId::from("u1")));

        let label = harness
            .storage
            .get_label(&UserId::from("u1"), &SessionId::from("s1"), "c@c.us")
            .await
            .unwrap();
        assert_eq!(label, Label::New);
        assert!(std::path::Path::new(&harness.config.media.uploads_dir).is_dir());
    }

    #[tokio::test]
    async fn test_config_has_no_delays() {
        let config = test_config();
        assert_eq!(config.ai.delay_seconds, 0);
        assert_eq!(config.sync.connect_delay_secs, 0);
    }
}
