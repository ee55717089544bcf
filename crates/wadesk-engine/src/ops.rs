// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations requested by UI clients on behalf of a user.
//!
//! Each method changes state and fans out the resulting update to every
//! connection of the user. Replies meant only for the requester are the
//! return values; the caller delivers them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use wadesk_core::events::MuteMap;
use wadesk_core::phone::normalize_phone;
use wadesk_core::records::{ContactDetails, ScheduledCall};
use wadesk_core::settings::{AiSettings, AiSettingsUpdate};
use wadesk_core::{
    Label, MessageId, MessageView, MuteDuration, RealtimeEvent, SessionId, StoredMessage,
    TransportClient, UserId, WadeskError,
};

use crate::deps::{ChatTarget, EngineDeps};
use crate::publish::send_and_record;
use crate::session::SessionManager;
use crate::snapshot::{history_snapshots, init_snapshot, session_snapshot};

pub struct ChatOps {
    deps: EngineDeps,
    sessions: Arc<SessionManager>,
}

impl ChatOps {
    pub fn new(deps: EngineDeps, sessions: Arc<SessionManager>) -> Self {
        Self { deps, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Whether `user` owns `session`. Lookup failures deny.
    pub async fn is_authorized(&self, user: &UserId, session: &SessionId) -> bool {
        match self.deps.store.is_user_authorized(user, session).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(user_id = %user, session_id = %session, error = %e, "authorization lookup failed");
                false
            }
        }
    }

    fn live_transport(&self, session: &SessionId) -> Result<Arc<dyn TransportClient>, WadeskError> {
        self.sessions
            .transport(session)
            .ok_or_else(|| WadeskError::NotFound(format!("session {session} is not active")))
    }

    /// `init` followed by `allChatsHistoryData` for each of the user's sessions.
    pub async fn initial_data(&self, user: &UserId) -> Vec<RealtimeEvent> {
        let mut events = vec![init_snapshot(&self.deps, user, |id| self.sessions.status(id)).await];
        events.extend(history_snapshots(&self.deps, user).await);
        events
    }

    /// Send a text as the business and record it.
    pub async fn send_text(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        text: &str,
    ) -> Result<StoredMessage, WadeskError> {
        let text = text.trim();
        if chat_id.is_empty() || text.is_empty() {
            return Err(WadeskError::Validation("chat id and content are required".into()));
        }
        let transport = self.live_transport(session)?;
        let target = ChatTarget::new(user.clone(), session.clone(), chat_id);
        let row = send_and_record(&self.deps, transport.as_ref(), &target, text).await?;
        info!(session_id = %session, chat_id, "message sent from client");
        Ok(row)
    }

    pub async fn delete_message(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        message_id: &MessageId,
    ) -> Result<(), WadeskError> {
        let transport = self.live_transport(session)?;
        transport.delete_message(chat_id, message_id).await?;
        if let Err(e) = self
            .deps
            .store
            .delete_message(user, session, chat_id, message_id)
            .await
        {
            warn!(message_id = %message_id, error = %e, "deleted remotely but not in storage");
        }
        Ok(())
    }

    pub async fn react(
        &self,
        session: &SessionId,
        message_id: &MessageId,
        reaction: &str,
    ) -> Result<(), WadeskError> {
        self.live_transport(session)?
            .send_reaction(message_id, reaction)
            .await
    }

    pub async fn mute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
        duration: MuteDuration,
    ) -> Result<MuteMap, WadeskError> {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return Err(WadeskError::Validation("phone number is required".into()));
        }
        self.deps
            .store
            .mute(user, session, &phone, duration, wadesk_core::now_ms())
            .await?;
        self.publish_mutes(user).await
    }

    pub async fn unmute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
    ) -> Result<MuteMap, WadeskError> {
        self.deps
            .store
            .unmute(user, session, &normalize_phone(phone))
            .await?;
        self.publish_mutes(user).await
    }

    async fn publish_mutes(&self, user: &UserId) -> Result<MuteMap, WadeskError> {
        let blacklist = self.deps.store.user_mutes(user).await?;
        self.deps.fanout.send_to_user(
            user,
            RealtimeEvent::MuteUpdated {
                blacklist: blacklist.clone(),
            },
        );
        Ok(blacklist)
    }

    pub async fn set_label(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        label: Label,
    ) -> Result<(), WadeskError> {
        self.deps
            .store
            .set_label(user, session, chat_id, label)
            .await?;
        self.deps.fanout.send_to_user(
            user,
            RealtimeEvent::LabelUpdated {
                session_id: session.to_string(),
                chat_id: chat_id.to_string(),
                label,
            },
        );
        Ok(())
    }

    /// Upsert contact fields. Blank values clear a field.
    pub async fn update_contact(
        &self,
        user: &UserId,
        phone: &str,
        details: ContactDetails,
    ) -> Result<(), WadeskError> {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return Err(WadeskError::Validation("phone number is required".into()));
        }
        if details.is_empty() {
            return Ok(());
        }
        self.deps
            .store
            .upsert_contact(user, &phone, &details)
            .await?;
        self.deps.fanout.send_to_user(
            user,
            RealtimeEvent::ContactUpdated {
                phone_number: phone,
                details,
            },
        );
        Ok(())
    }

    pub async fn ai_settings(&self, user: &UserId) -> AiSettings {
        self.deps.settings_for(user).await
    }

    /// Apply a client settings payload; invalid fields are skipped with a warning.
    /// A payload with no valid field changes nothing.
    pub async fn update_ai_settings(&self, user: &UserId, payload: &Value) -> Result<AiSettings, WadeskError> {
        let (update, warnings) = AiSettingsUpdate::from_value(payload)?;
        for warning in &warnings {
            warn!(user_id = %user, "{warning}");
        }
        if update.is_empty() {
            debug!(user_id = %user, "no valid settings fields, nothing to store");
            return Ok(self.deps.settings_for(user).await);
        }
        self.deps.store.update_ai_settings(user, &update).await?;
        let settings = self.deps.settings_for(user).await;
        self.deps.fanout.send_to_user(
            user,
            RealtimeEvent::AiSettingsData {
                settings: settings.clone(),
            },
        );
        Ok(settings)
    }

    /// Flip the process-wide AI switch and tell every client.
    pub fn set_ai_enabled(&self, enabled: bool) {
        self.deps.ai.set_enabled(enabled);
        info!(enabled, "AI switched");
        self.deps
            .fanout
            .broadcast(RealtimeEvent::AiStateConfirmed { enabled });
    }

    pub fn ai_enabled(&self) -> bool {
        self.deps.ai.is_enabled()
    }

    pub async fn chat_history(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Vec<MessageView>, WadeskError> {
        let rows = self.deps.store.chat_history(user, session, chat_id).await?;
        Ok(rows.iter().map(MessageView::from).collect())
    }

    pub async fn session_history(&self, user: &UserId, session: &SessionId) -> RealtimeEvent {
        session_snapshot(&self.deps, user, session).await
    }

    pub async fn scheduled_call(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Option<ScheduledCall>, WadeskError> {
        self.deps.store.latest_call(user, session, chat_id).await
    }

    /// Load a chat's entire remote history into storage and return it oldest first.
    pub async fn full_history(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Vec<MessageView>, WadeskError> {
        let transport = self.live_transport(session)?;
        let rows = self
            .sessions
            .history()
            .full_history(transport.as_ref(), user, session, chat_id)
            .await?;
        Ok(rows.iter().map(MessageView::from).collect())
    }
}
