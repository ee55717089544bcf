// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`PersistenceGateway`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use wadesk_config::model::StorageConfig;
use wadesk_core::events::{LabelMap, MuteMap};
use wadesk_core::records::{
    Contact, ContactDetails, NewScheduledCall, ScheduledCall, SessionRecord,
};
use wadesk_core::settings::{AiSettingsUpdate, StoredAiSettings};
use wadesk_core::{
    AdapterType, HealthStatus, InsertOutcome, Label, MessageId, MuteDuration, PersistenceGateway,
    PluginAdapter, SessionId, SessionStatus, StoredMessage, UserId, WadeskError, now_ms,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed persistence gateway.
///
/// The database is opened lazily by [`PersistenceGateway::initialize`];
/// every other call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, WadeskError> {
        self.db
            .get()
            .ok_or_else(|| WadeskError::storage("storage not initialized -- call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WadeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WadeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteStorage {
    async fn initialize(&self) -> Result<(), WadeskError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| WadeskError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), WadeskError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- session registry ---

    async fn register_session(
        &self,
        session: &SessionId,
        user: &UserId,
    ) -> Result<(), WadeskError> {
        queries::sessions::register_session(self.db()?, session, user, now_ms()).await
    }

    async fn session_owner(&self, session: &SessionId) -> Result<Option<UserId>, WadeskError> {
        queries::sessions::session_owner(self.db()?, session).await
    }

    async fn is_user_authorized(
        &self,
        user: &UserId,
        session: &SessionId,
    ) -> Result<bool, WadeskError> {
        queries::sessions::is_user_authorized(self.db()?, user, session).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, WadeskError> {
        queries::sessions::list_sessions(self.db()?).await
    }

    async fn list_user_sessions(&self, user: &UserId) -> Result<Vec<SessionRecord>, WadeskError> {
        queries::sessions::list_user_sessions(self.db()?, user).await
    }

    async fn update_session_status(
        &self,
        session: &SessionId,
        status: SessionStatus,
    ) -> Result<(), WadeskError> {
        queries::sessions::update_session_status(self.db()?, session, status, now_ms()).await
    }

    // --- messages ---

    async fn insert_message(&self, message: &StoredMessage) -> Result<InsertOutcome, WadeskError> {
        queries::messages::insert_message(self.db()?, message, now_ms()).await
    }

    async fn upsert_messages(&self, messages: &[StoredMessage]) -> Result<usize, WadeskError> {
        queries::messages::upsert_messages(self.db()?, messages).await
    }

    async fn update_message_file_name(
        &self,
        session: &SessionId,
        external_id: &MessageId,
        file_name: &str,
    ) -> Result<(), WadeskError> {
        queries::messages::update_file_name(self.db()?, session, external_id, file_name).await
    }

    async fn update_transcription(
        &self,
        session: &SessionId,
        external_id: &MessageId,
        content: &str,
        is_voice_transcription: bool,
        failed: bool,
    ) -> Result<(), WadeskError> {
        queries::messages::update_transcription(
            self.db()?,
            session,
            external_id,
            content,
            is_voice_transcription,
            failed,
        )
        .await
    }

    async fn delete_message(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        external_id: &MessageId,
    ) -> Result<(), WadeskError> {
        queries::messages::delete_message(self.db()?, user, session, chat_id, external_id).await
    }

    async fn recent_messages(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, WadeskError> {
        queries::messages::recent_messages(self.db()?, user, session, chat_id, limit).await
    }

    async fn chat_history(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Vec<StoredMessage>, WadeskError> {
        queries::messages::chat_history(self.db()?, user, session, chat_id).await
    }

    async fn session_history(
        &self,
        user: &UserId,
        session: &SessionId,
    ) -> Result<BTreeMap<String, Vec<StoredMessage>>, WadeskError> {
        queries::messages::session_history(self.db()?, user, session).await
    }

    async fn count_messages(&self, session: &SessionId) -> Result<usize, WadeskError> {
        queries::messages::count_messages(self.db()?, session).await
    }

    // --- labels ---

    async fn get_label(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Label, WadeskError> {
        queries::labels::get_label(self.db()?, user, session, chat_id).await
    }

    async fn set_label(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        label: Label,
    ) -> Result<(), WadeskError> {
        queries::labels::set_label(self.db()?, user, session, chat_id, label, now_ms()).await
    }

    async fn ensure_default_labels(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_ids: &[String],
    ) -> Result<usize, WadeskError> {
        queries::labels::ensure_default_labels(self.db()?, user, session, chat_ids, now_ms()).await
    }

    async fn user_labels(
        &self,
        user: &UserId,
    ) -> Result<BTreeMap<String, LabelMap>, WadeskError> {
        queries::labels::user_labels(self.db()?, user).await
    }

    // --- mutes ---

    async fn is_muted(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
        now_ms: i64,
    ) -> Result<bool, WadeskError> {
        queries::mutes::is_muted(self.db()?, user, session, phone, now_ms).await
    }

    async fn mute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
        duration: MuteDuration,
        now_ms: i64,
    ) -> Result<(), WadeskError> {
        queries::mutes::mute(self.db()?, user, session, phone, duration, now_ms).await
    }

    async fn unmute(
        &self,
        user: &UserId,
        session: &SessionId,
        phone: &str,
    ) -> Result<(), WadeskError> {
        queries::mutes::unmute(self.db()?, user, session, phone).await
    }

    async fn user_mutes(&self, user: &UserId) -> Result<MuteMap, WadeskError> {
        queries::mutes::user_mutes(self.db()?, user).await
    }

    // --- AI settings ---

    async fn ai_settings(&self, user: &UserId) -> Result<Option<StoredAiSettings>, WadeskError> {
        queries::settings::get_settings(self.db()?, user).await
    }

    async fn update_ai_settings(
        &self,
        user: &UserId,
        update: &AiSettingsUpdate,
    ) -> Result<(), WadeskError> {
        queries::settings::update_settings(self.db()?, user, update, now_ms()).await
    }

    // --- contacts ---

    async fn upsert_contact(
        &self,
        user: &UserId,
        phone: &str,
        details: &ContactDetails,
    ) -> Result<(), WadeskError> {
        queries::contacts::upsert_contact(self.db()?, user, phone, details, now_ms()).await
    }

    async fn get_contact(
        &self,
        user: &UserId,
        phone: &str,
    ) -> Result<Option<Contact>, WadeskError> {
        queries::contacts::get_contact(self.db()?, user, phone).await
    }

    async fn user_contacts(&self, user: &UserId) -> Result<Vec<Contact>, WadeskError> {
        queries::contacts::user_contacts(self.db()?, user).await
    }

    // --- scheduled calls ---

    async fn insert_call(&self, call: &NewScheduledCall) -> Result<ScheduledCall, WadeskError> {
        queries::calls::insert_call(self.db()?, call, now_ms()).await
    }

    async fn update_pending_call(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
        requested_time_text: &str,
        now_ms: i64,
    ) -> Result<Option<ScheduledCall>, WadeskError> {
        queries::calls::update_pending_call(
            self.db()?,
            user,
            session,
            chat_id,
            requested_time_text,
            now_ms,
        )
        .await
    }

    async fn latest_call(
        &self,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Option<ScheduledCall>, WadeskError> {
        queries::calls::latest_call(self.db()?, user, session, chat_id).await
    }
}
