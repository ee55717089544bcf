// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background transcription of one inbound voice note.
//!
//! The job reports only through storage writes and fan-out events. Its
//! working directory is removed after the configured cleanup delay.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use wadesk_core::message::placeholders;
use wadesk_core::{MessageId, RealtimeEvent, TransportClient, TransportMessage, WadeskError};
use wadesk_transcribe::JobDir;

use crate::deps::{ChatTarget, EngineDeps};
use crate::media::audio_extension;
use crate::orchestrator::AiOrchestrator;

/// How a voice job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceStatus {
    Transcribed(String),
    Empty,
    ProcessingError,
}

pub struct VoiceJob {
    pub(crate) deps: EngineDeps,
    pub(crate) orchestrator: Arc<AiOrchestrator>,
    pub(crate) transport: Arc<dyn TransportClient>,
    pub(crate) target: ChatTarget,
    pub(crate) message: TransportMessage,
}

impl VoiceJob {
    /// `{user[..4]}_{session}_{phone}_{now}`.
    fn job_id(&self, now_ms: i64) -> String {
        let user: String = self.target.user.as_str().chars().take(4).collect();
        format!("{user}_{}_{}_{now_ms}", self.target.session, self.target.phone)
    }

    pub async fn run(self) -> VoiceStatus {
        let id = self.job_id(wadesk_core::now_ms());
        let message_id = MessageId(self.message.id.clone());
        let cleanup = Duration::from_secs(self.deps.config.transcription.cleanup_delay_secs);

        let dir = match JobDir::create(&self.deps.config.transcription.recordings_dir, &id).await
        {
            Ok(dir) => dir,
            Err(e) => {
                self.processing_failed(&message_id, &e).await;
                return VoiceStatus::ProcessingError;
            }
        };

        let status = match self.fetch_audio(&dir, &id, &message_id).await {
            Ok(audio) => {
                let transcript = self
                    .deps
                    .transcriber
                    .transcribe(&audio, dir.path(), &id)
                    .await;
                self.finish(&message_id, transcript.trim()).await
            }
            Err(e) => {
                self.processing_failed(&message_id, &e).await;
                VoiceStatus::ProcessingError
            }
        };

        dir.schedule_removal(cleanup);
        status
    }

    async fn fetch_audio(
        &self,
        dir: &JobDir,
        id: &str,
        message_id: &MessageId,
    ) -> Result<std::path::PathBuf, WadeskError> {
        let bytes = self.transport.decrypt_file(&self.message).await?;
        let file_name = format!("audio_{id}{}", audio_extension(self.message.mimetype.as_deref()));
        let path = dir.file(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| WadeskError::Internal(format!("cannot write {}: {e}", path.display())))?;

        if let Err(e) = self
            .deps
            .store
            .update_message_file_name(&self.target.session, message_id, &file_name)
            .await
        {
            warn!(message_id = %message_id, error = %e, "failed to record voice file name");
        }
        Ok(path)
    }

    async fn finish(&self, message_id: &MessageId, transcript: &str) -> VoiceStatus {
        let target = &self.target;
        if transcript.is_empty() {
            self.mark_failed(message_id, placeholders::VOICE_TRANSCRIPTION_FAILED)
                .await;
            self.deps.fanout.send_to_user(
                &target.user,
                RealtimeEvent::TranscriptionFailed {
                    session_id: target.session.to_string(),
                    chat_id: target.chat_id.clone(),
                    original_message_id: message_id.to_string(),
                    error: "Empty or failed transcript".into(),
                },
            );
            return VoiceStatus::Empty;
        }

        info!(session_id = %target.session, chat_id = %target.chat_id, "voice note transcribed");
        if let Err(e) = self
            .deps
            .store
            .update_transcription(&target.session, message_id, transcript, true, false)
            .await
        {
            warn!(message_id = %message_id, error = %e, "failed to store transcript");
        }
        self.deps.fanout.send_to_user(
            &target.user,
            RealtimeEvent::Transcription {
                session_id: target.session.to_string(),
                chat_id: target.chat_id.clone(),
                transcript: transcript.to_string(),
                original_message_id: message_id.to_string(),
            },
        );

        self.orchestrator
            .respond(self.transport.as_ref(), target, transcript)
            .await;
        VoiceStatus::Transcribed(transcript.to_string())
    }

    async fn processing_failed(&self, message_id: &MessageId, error: &WadeskError) {
        warn!(
            session_id = %self.target.session,
            message_id = %message_id,
            error = %error,
            "voice processing failed"
        );
        self.mark_failed(message_id, placeholders::VOICE_PROCESSING_ERROR)
            .await;
        self.deps.fanout.send_to_user(
            &self.target.user,
            RealtimeEvent::TranscriptionFailed {
                session_id: self.target.session.to_string(),
                chat_id: self.target.chat_id.clone(),
                original_message_id: message_id.to_string(),
                error: format!("File processing error: {error}"),
            },
        );
    }

    async fn mark_failed(&self, message_id: &MessageId, content: &str) {
        if let Err(e) = self
            .deps
            .store
            .update_transcription(&self.target.session, message_id, content, true, true)
            .await
        {
            warn!(message_id = %message_id, error = %e, "failed to mark transcription failure");
        }
    }
}
