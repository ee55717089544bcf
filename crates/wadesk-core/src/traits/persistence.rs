// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence gateway for the session registry, messages, labels, mutes,
//! settings, contacts and scheduled calls.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::WadeskError;
use crate::events::{LabelMap, MuteMap};
use crate::message::{InsertOutcome, StoredMessage};
use crate::records::{Contact, ContactDetails, NewScheduledCall, ScheduledCall, SessionRecord};
use crate::settings::{AiSettingsUpdate, StoredAiSettings};
use crate::traits::adapter::PluginAdapter;
use crate::types::{Label, MessageId, MuteDuration, SessionId, SessionStatus, UserId};

/// Durable store behind the engine.
///
/// Messages are keyed by `(session, external_id)`. Inserting an existing key
/// is not an error; it reports [`InsertOutcome::Duplicate`].
#[async_trait]
pub trait PersistenceGateway: PluginAdapter {
    /// Open connections and run migrations.
    async fn initialize(&self) -> Result<(), WadeskError>;

    /// Checkpoint and close.
    async fn close(&self) -> Result<(), WadeskError>;

    // --- session registry ---

    async fn register_session(&self, session: &SessionId, user: &UserId)
    -> Result<(), WadeskError>;

    async fn session_owner(&self, session: &SessionId) -> Result<Option<UserId>, WadeskError>;

    async fn is_user_authorized(
        &self,
        user: &UserId,
        session: &SessionId,
    ) -> Result<bool, WadeskError>;

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, WadeskError>;

    async fn list_user_sessions(&self, user: &UserId) -> Result<Vec<SessionRecord>, WadeskError>;

    async fn update_session_status(
        &self,
        session: &SessionId,
        status: SessionStatus,
    ) -> Result<(), WadeskError>;

    // --- messages ---

    /// Ensure the chat's default label, then insert the row.
    async fn insert_message(&self, message: &StoredMessage) -> Result<InsertOutcome, WadeskError>;

    /// Insert a batch; existing keys only get their reactions refreshed.
    /// Returns the number of rows in the batch.
    async fn upsert_messages(&self, messages: &[StoredMessage]) -> Result<usize, WadeskError>;

    async fn update_message_file_name(
        &self,
        session: &SessionId,
        external_id: &MessageId,
        file_name: &str,
    ) -> Result<(), WadeskError>;

    async fn update_transcription(
        &self,
        session: &SessionId,
        external_id: &MessageId,
        content: &str,
        is_voice_transcription: bool,
        failed: bool,
    ) -> Result<(), WadeskError>;

    async fn delete_message(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        external_id: &MessageId,
    ) -> Result<(), WadeskError>;

    /// The newest `limit` messages of a chat, returned oldest first.
    async fn recent_messages(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, WadeskError>;

    /// Every message of a chat, oldest first.
    async fn chat_history(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Vec<StoredMessage>, WadeskError>;

    /// Every message of a session grouped by chat, each group oldest first.
    async fn session_history(
        &self,
        user: &UserId,
        session: &SessionId,
    ) -> Result<BTreeMap<String, Vec<StoredMessage>>, WadeskError>;

    async fn count_messages(&self, session: &SessionId) -> Result<usize, WadeskError>;

    // --- labels ---

    /// The chat's label, [`Label::New`] when none was ever set.
    async fn get_label(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Label, WadeskError>;

    async fn set_label(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        label: Label,
    ) -> Result<(), WadeskError>;

    /// Insert the default label for each chat that has none. Returns how many chats were given.
    async fn ensure_default_labels(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_ids: &[String],
    ) -> Result<usize, WadeskError>;

    /// Session → chat → label for every session of `user`.
    async fn user_labels(&self, user: &UserId)
    -> Result<BTreeMap<String, LabelMap>, WadeskError>;

    // --- mutes ---

    /// Whether `phone` is muted at `now_ms`. An expired entry is deleted and reported unmuted.
    async fn is_muted(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
        now_ms: i64,
    ) -> Result<bool, WadeskError>;

    async fn mute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
        duration: MuteDuration,
        now_ms: i64,
    ) -> Result<(), WadeskError>;

    async fn unmute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
    ) -> Result<(), WadeskError>;

    /// Phone → expiry for all of `user`'s mutes.
    async fn user_mutes(&self, user: &UserId) -> Result<MuteMap, WadeskError>;

    // --- AI settings ---

    async fn ai_settings(&self, user: &UserId) -> Result<Option<StoredAiSettings>, WadeskError>;

    async fn update_ai_settings(
        &self,
        user: &UserId,
        update: &AiSettingsUpdate,
    ) -> Result<(), WadeskError>;

    // --- contacts ---

    async fn upsert_contact(
        &self,
        user: &UserId,
        phone: &str,
        details: &ContactDetails,
    ) -> Result<(), WadeskError>;

    async fn get_contact(&self, user: &UserId, phone: &str)
    -> Result<Option<Contact>, WadeskError>;

    async fn user_contacts(&self, user: &UserId) -> Result<Vec<Contact>, WadeskError>;

    // --- scheduled calls ---

    async fn insert_call(&self, call: &NewScheduledCall) -> Result<ScheduledCall, WadeskError>;

    /// Set a new time on the chat's pending calls; `None` when no pending row matched.
    async fn update_pending_call(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        requested_time_text: &str,
        now_ms: i64,
    ) -> Result<Option<ScheduledCall>, WadeskError>;

    /// The most recently created call of a chat.
    async fn latest_call(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Option<ScheduledCall>, WadeskError>;
}
