// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message pipeline.
//!
//! Every transport message passes the same gates in order: type allow-list,
//! scope, ownership, mute, owner echo, AI pause and AI switch. Whatever
//! survives is stored and then answered, transcribed, or saved as media.

use std::path::Path;
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use wadesk_core::message::placeholders;
use wadesk_core::phone::{is_direct_chat, normalize_phone};
use wadesk_core::{
    ContentKind, MessageId, Role, SessionId, StoredMessage, TransportClient, TransportMessage,
    UserId,
};

use crate::deps::{ChatTarget, EngineDeps};
use crate::media;
use crate::orchestrator::{AiOrchestrator, TurnReport};
use crate::publish::record;
use crate::voice::VoiceJob;

/// Why a message was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnsupportedType,
    OutOfScope,
    NoOwner,
    Muted,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Dropped(DropReason),
    OwnerEcho,
    Paused,
    AiDisabled,
    VoiceQueued,
    MediaStored,
    MediaFailed,
    TextAnswered(TurnReport),
}

pub struct MessagePipeline {
    deps: EngineDeps,
    orchestrator: Arc<AiOrchestrator>,
    voice_jobs: TaskTracker,
}

impl MessagePipeline {
    pub fn new(deps: EngineDeps, orchestrator: Arc<AiOrchestrator>) -> Self {
        Self {
            deps,
            orchestrator,
            voice_jobs: TaskTracker::new(),
        }
    }

    pub async fn handle(
        &self,
        session: &SessionId,
        transport: Arc<dyn TransportClient>,
        message: TransportMessage,
    ) -> PipelineOutcome {
        let Some(kind) = message.content_kind() else {
            debug!(session_id = %session, kind = ?message.kind, "ignoring message type");
            return PipelineOutcome::Dropped(DropReason::UnsupportedType);
        };
        if message.id.is_empty() || message.chat_id.is_empty() {
            return PipelineOutcome::Dropped(DropReason::UnsupportedType);
        }
        if !is_direct_chat(&message.chat_id, message.is_group_msg) {
            return PipelineOutcome::Dropped(DropReason::OutOfScope);
        }

        let user = match self.deps.store.session_owner(session).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(session_id = %session, "no owner for session, ignoring message");
                return PipelineOutcome::Dropped(DropReason::NoOwner);
            }
            Err(e) => {
                warn!(session_id = %session, error = %e, "owner lookup failed, ignoring message");
                return PipelineOutcome::Dropped(DropReason::NoOwner);
            }
        };
        let target = ChatTarget::new(user, session.clone(), message.chat_id.clone());
        let now = wadesk_core::now_ms();

        let muted = self
            .deps
            .store
            .is_muted(
                &target.user,
                &target.session,
                &normalize_phone(&target.phone),
                now,
            )
            .await
            .unwrap_or_else(|e| {
                warn!(chat_id = %target.chat_id, error = %e, "mute lookup failed");
                false
            });
        if muted {
            info!(chat_id = %target.chat_id, "message from muted number");
            return PipelineOutcome::Dropped(DropReason::Muted);
        }

        let is_voice = message.is_voice();
        let timestamp = message.timestamp_ms(now);
        let row = |role: Role, content: String| {
            let mut row = StoredMessage::new(
                target.user.clone(),
                target.session.clone(),
                target.chat_id.clone(),
                MessageId(message.id.clone()),
                role,
                content,
                timestamp,
            );
            row.is_voice = is_voice;
            row.reactions = message.reactions.clone();
            row
        };

        if message.from_me {
            self.deps.ai.arm_pause(now);
            let mut echo = row(Role::Assistant, message.text_or_placeholder());
            echo.file_type = message.file_type();
            echo.file_name = message.filename.clone();
            record(&self.deps, &target, &echo).await;
            return PipelineOutcome::OwnerEcho;
        }

        if self.deps.ai.is_paused(now) {
            info!(chat_id = %target.chat_id, "AI paused, storing message only");
            record(
                &self.deps,
                &target,
                &row(Role::User, placeholders::BOT_PAUSED.to_string()),
            )
            .await;
            return PipelineOutcome::Paused;
        }

        if !self.deps.ai.is_enabled() {
            let content = if is_voice {
                placeholders::VOICE_AI_OFF.to_string()
            } else {
                message
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(placeholders::MEDIA_AI_OFF)
                    .to_string()
            };
            let mut off = row(Role::User, content);
            off.file_type = message
                .file_type()
                .or_else(|| is_voice.then(|| "audio".to_string()));
            off.file_name = message.filename.clone();
            off.duration = message.duration;
            record(&self.deps, &target, &off).await;
            return PipelineOutcome::AiDisabled;
        }

        if is_voice {
            let mut pending = row(Role::User, placeholders::VOICE_PENDING.to_string());
            pending.duration = message.duration;
            record(&self.deps, &target, &pending).await;

            let job = VoiceJob {
                deps: self.deps.clone(),
                orchestrator: Arc::clone(&self.orchestrator),
                transport,
                target,
                message,
            };
            self.voice_jobs.spawn(async move {
                let status = job.run().await;
                debug!(?status, "voice job finished");
            });
            return PipelineOutcome::VoiceQueued;
        }

        if kind != ContentKind::Chat {
            return self
                .store_media(transport.as_ref(), &target, &message, row(Role::User, String::new()))
                .await;
        }

        let Some(text) = message
            .body
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return PipelineOutcome::Dropped(DropReason::EmptyText);
        };
        record(&self.deps, &target, &row(Role::User, text.to_string())).await;
        let report = self
            .orchestrator
            .respond(transport.as_ref(), &target, text)
            .await;
        PipelineOutcome::TextAnswered(report)
    }

    async fn store_media(
        &self,
        transport: &dyn TransportClient,
        target: &ChatTarget,
        message: &TransportMessage,
        mut row: StoredMessage,
    ) -> PipelineOutcome {
        let kind = message.kind.clone().unwrap_or_default().to_ascii_lowercase();
        row.duration = message.duration;
        let name = media::upload_file_name(
            target.user.as_str(),
            target.session.as_str(),
            &target.chat_id,
            message,
            wadesk_core::now_ms(),
            &media::nonce(),
        );
        let dir = Path::new(&self.deps.config.media.uploads_dir);

        let saved = match transport.decrypt_file(message).await {
            Ok(bytes) => media::write_upload(dir, &name, &bytes).await,
            Err(e) => Err(e),
        };
        let outcome = match saved {
            Ok(path) => {
                info!(chat_id = %target.chat_id, path = %path.display(), "media stored");
                row.content = message
                    .caption
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| placeholders::media_tag(&kind));
                row.file_type = Some(kind);
                row.file_name = Some(name);
                PipelineOutcome::MediaStored
            }
            Err(e) => {
                warn!(chat_id = %target.chat_id, error = %e, "failed to store media");
                row.content = placeholders::media_save_failed(&kind);
                row.file_type = Some(placeholders::FILE_TYPE_ERROR.to_string());
                PipelineOutcome::MediaFailed
            }
        };
        record(&self.deps, target, &row).await;
        outcome
    }

    /// Wait for every voice job spawned so far.
    pub async fn wait_voice_jobs(&self) {
        self.voice_jobs.close();
        self.voice_jobs.wait().await;
        self.voice_jobs.reopen();
    }

    pub fn voice_jobs_in_flight(&self) -> usize {
        self.voice_jobs.len()
    }
}

/// Owner of `session` for callers outside the pipeline, `None` on lookup failure.
pub async fn owner_of(deps: &EngineDeps, session: &SessionId) -> Option<UserId> {
    match deps.store.session_owner(session).await {
        Ok(owner) => owner,
        Err(e) => {
            warn!(session_id = %session, error = %e, "owner lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wadesk_core::{MuteDuration, PersistenceGateway};
    use wadesk_test_utils::{MockTransport, TestHarness};

    use crate::testing::deps;
    use crate::tools::ToolRegistry;

    const CHAT: &str = "972501234567@c.us";

    struct Fixture {
        harness: TestHarness,
        deps: EngineDeps,
        pipeline: MessagePipeline,
        transport: Arc<MockTransport>,
    }

    async fn fixture() -> Fixture {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.register("s1", "u1").await.unwrap();
        let deps = deps(&harness);
        let orchestrator = Arc::new(AiOrchestrator::new(
            deps.clone(),
            Arc::new(ToolRegistry::default()),
        ));
        Fixture {
            pipeline: MessagePipeline::new(deps.clone(), orchestrator),
            deps,
            harness,
            transport: Arc::new(MockTransport::default()),
        }
    }

    fn inbound(id: &str, kind: &str, body: &str) -> TransportMessage {
        TransportMessage {
            id: id.into(),
            chat_id: CHAT.into(),
            kind: Some(kind.into()),
            body: Some(body.into()),
            timestamp: 1_700_000_000,
            ..Default::default()
        }
    }

    impl Fixture {
        async fn handle(&self, message: TransportMessage) -> PipelineOutcome {
            self.pipeline
                .handle(&SessionId::from("s1"), self.transport.clone(), message)
                .await
        }

        async fn rows(&self) -> Vec<StoredMessage> {
            self.harness
                .storage
                .chat_history(&UserId::from("u1"), &SessionId::from("s1"), CHAT)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn gates_drop_out_of_scope_messages() {
        let f = fixture().await;
        assert_eq!(
            f.handle(inbound("1", "e2e_notification", "")).await,
            PipelineOutcome::Dropped(DropReason::UnsupportedType)
        );

        let mut group = inbound("2", "chat", "hi all");
        group.chat_id = "123-456@g.us".into();
        group.is_group_msg = true;
        assert_eq!(
            f.handle(group).await,
            PipelineOutcome::Dropped(DropReason::OutOfScope)
        );

        let mut status = inbound("3", "chat", "story");
        status.chat_id = "status@broadcast".into();
        assert_eq!(
            f.handle(status).await,
            PipelineOutcome::Dropped(DropReason::OutOfScope)
        );

        let orphan = f
            .pipeline
            .handle(
                &SessionId::from("unknown"),
                f.transport.clone(),
                inbound("4", "chat", "hello"),
            )
            .await;
        assert_eq!(orphan, PipelineOutcome::Dropped(DropReason::NoOwner));
        assert!(f.rows().await.is_empty());
    }

    #[tokio::test]
    async fn type_allow_list_is_case_insensitive() {
        let f = fixture().await;
        let outcome = f.handle(inbound("1", "CHAT", "hello")).await;
        assert!(matches!(outcome, PipelineOutcome::TextAnswered(_)));
    }

    #[tokio::test]
    async fn muted_numbers_are_ignored() {
        let f = fixture().await;
        f.harness
            .storage
            .mute(
                &UserId::from("u1"),
                &SessionId::from("s1"),
                "972501234567",
                MuteDuration::Forever,
                wadesk_core::now_ms(),
            )
            .await
            .unwrap();
        assert_eq!(
            f.handle(inbound("1", "chat", "hello")).await,
            PipelineOutcome::Dropped(DropReason::Muted)
        );
        assert_eq!(f.harness.llm.call_count().await, 0);
    }

    #[tokio::test]
    async fn text_is_stored_and_answered() {
        let f = fixture().await;
        let outcome = f.handle(inbound("in-1", "chat", "  how much?  ")).await;
        let PipelineOutcome::TextAnswered(report) = outcome else {
            panic!("expected an answer, got {outcome:?}");
        };
        assert!(report.text_sent);

        let rows = f.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "how much?");
        assert_eq!(rows[0].role, Role::User);
        assert_eq!(rows[1].role, Role::Assistant);

        let requests = f.harness.llm.requests().await;
        let user_turns: Vec<_> = requests[0]
            .messages
            .iter()
            .filter(|m| m.role == "user")
            .collect();
        assert_eq!(user_turns.len(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_dropped() {
        let f = fixture().await;
        assert_eq!(
            f.handle(inbound("1", "chat", "   ")).await,
            PipelineOutcome::Dropped(DropReason::EmptyText)
        );
    }

    #[tokio::test]
    async fn duplicate_delivery_keeps_one_row() {
        let f = fixture().await;
        f.handle(inbound("in-1", "chat", "hello")).await;
        f.handle(inbound("in-1", "chat", "hello")).await;
        let user_rows = f
            .rows()
            .await
            .into_iter()
            .filter(|r| r.role == Role::User)
            .count();
        assert_eq!(user_rows, 1);
    }

    #[tokio::test]
    async fn owner_echo_pauses_the_assistant() {
        let f = fixture().await;
        let mut echo = inbound("out-1", "chat", "ok");
        echo.from_me = true;
        assert_eq!(f.handle(echo).await, PipelineOutcome::OwnerEcho);
        assert!(f.deps.ai.is_paused(wadesk_core::now_ms()));

        let outcome = f.handle(inbound("in-1", "chat", "are you there?")).await;
        assert_eq!(outcome, PipelineOutcome::Paused);
        assert_eq!(f.harness.llm.call_count().await, 0);
        assert!(f.transport.sent_texts().await.is_empty());

        let rows = f.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, Role::Assistant);
        assert_eq!(rows[1].content, placeholders::BOT_PAUSED);
    }

    #[tokio::test]
    async fn processing_resumes_after_pause_expires() {
        let f = fixture().await;
        f.deps.ai.arm_pause(wadesk_core::now_ms() - 301_000);
        let outcome = f.handle(inbound("in-1", "chat", "hello")).await;
        assert!(matches!(outcome, PipelineOutcome::TextAnswered(_)));
    }

    #[tokio::test]
    async fn disabled_ai_stores_placeholders() {
        let f = fixture().await;
        f.deps.ai.set_enabled(false);

        let mut voice = inbound("v1", "ptt", "");
        voice.body = None;
        assert_eq!(f.handle(voice).await, PipelineOutcome::AiDisabled);

        let mut image = inbound("i1", "image", "");
        image.body = None;
        assert_eq!(f.handle(image).await, PipelineOutcome::AiDisabled);

        let rows = f.rows().await;
        assert_eq!(rows[0].content, placeholders::VOICE_AI_OFF);
        assert_eq!(rows[0].file_type.as_deref(), Some("audio"));
        assert_eq!(rows[1].content, placeholders::MEDIA_AI_OFF);
        assert_eq!(rows[1].file_type.as_deref(), Some("image"));
        assert_eq!(f.harness.llm.call_count().await, 0);
    }

    #[tokio::test]
    async fn media_is_saved_to_uploads() {
        let f = fixture().await;
        f.transport.set_media(vec![0xFF, 0xD8]).await;
        let mut image = inbound("i1", "image", "");
        image.body = None;
        image.caption = Some("our menu".into());
        image.mimetype = Some("image/jpeg".into());

        assert_eq!(f.handle(image).await, PipelineOutcome::MediaStored);
        let row = f.rows().await.remove(0);
        assert_eq!(row.content, "our menu");
        assert_eq!(row.file_type.as_deref(), Some("image"));
        let name = row.file_name.unwrap();
        assert!(name.ends_with(".jpg"));
        let stored = Path::new(&f.harness.config.media.uploads_dir).join(name);
        assert_eq!(std::fs::read(stored).unwrap(), vec![0xFF, 0xD8]);
        assert_eq!(f.harness.llm.call_count().await, 0);
    }

    #[tokio::test]
    async fn media_keeps_its_duration() {
        let f = fixture().await;
        f.transport.set_media(vec![0, 0, 0, 0x18]).await;
        let mut video = inbound("vid1", "video", "");
        video.body = None;
        video.mimetype = Some("video/mp4".into());
        video.duration = Some(12);

        assert_eq!(f.handle(video).await, PipelineOutcome::MediaStored);
        let row = f.rows().await.remove(0);
        assert_eq!(row.file_type.as_deref(), Some("video"));
        assert_eq!(row.duration, Some(12));
    }

    #[tokio::test]
    async fn media_failure_is_recorded() {
        let f = fixture().await;
        let mut doc = inbound("d1", "document", "");
        doc.body = None;
        assert_eq!(f.handle(doc).await, PipelineOutcome::MediaFailed);
        let row = f.rows().await.remove(0);
        assert_eq!(row.content, "[שגיאה בשמירת קובץ document]");
        assert_eq!(row.file_type.as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn voice_is_queued_then_transcribed() {
        let f = fixture().await;
        f.transport.set_media(b"OggS".to_vec()).await;
        let mut voice = inbound("v1", "ptt", "");
        voice.body = None;
        voice.duration = Some(4);

        assert_eq!(f.handle(voice).await, PipelineOutcome::VoiceQueued);
        tokio::time::timeout(Duration::from_secs(5), f.pipeline.wait_voice_jobs())
            .await
            .unwrap();

        let rows = f.rows().await;
        assert_eq!(rows[0].content, "mock transcript");
        assert!(rows[0].is_voice);
        assert_eq!(rows[0].duration, Some(4));
        assert_eq!(f.harness.fanout.count_of("transcription"), 1);
        assert_eq!(f.pipeline.voice_jobs_in_flight(), 0);
    }
}
