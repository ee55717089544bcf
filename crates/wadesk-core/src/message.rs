// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message shapes: raw transport messages, persisted rows, and the UI projection.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ContentKind, MessageId, Role, SessionId, UserId};

/// Fixed texts stored in place of message content.
pub mod placeholders {
    pub const BOT_PAUSED: &str = "[Ignored - Bot paused]";
    pub const VOICE_AI_OFF: &str = "[Voice - AI Off]";
    pub const MEDIA_AI_OFF: &str = "[Media - AI Off]";
    pub const VOICE_PENDING: &str = "[Voice Message]";
    pub const VOICE_TRANSCRIPTION_FAILED: &str = "[Voice - Transcr. Failed]";
    pub const VOICE_TRANSCRIPTION_ERROR: &str = "[Voice - Transcr. Error]";
    pub const VOICE_PROCESSING_ERROR: &str = "[Voice - Proc. Error]";
    pub const VOICE: &str = "[Voice]";
    pub const MEDIA: &str = "[Media]";
    /// `file_type` recorded when a media download failed.
    pub const FILE_TYPE_ERROR: &str = "error";

    /// Content stored when a media file could not be fetched or written.
    pub fn media_save_failed(kind: &str) -> String {
        format!("[שגיאה בשמירת קובץ {kind}]")
    }

    /// Content stored for media without a caption, e.g. `[IMAGE]`.
    pub fn media_tag(kind: &str) -> String {
        format!("[{}]", kind.to_uppercase())
    }
}

/// A message as delivered by the chat transport.
///
/// The id and sender fields may arrive either as a plain string or as an object with
/// a `_serialized` member; both forms are flattened to strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportMessage {
    #[serde(default, deserialize_with = "de_chat_id")]
    pub id: String,
    #[serde(rename = "from", default, deserialize_with = "de_chat_id")]
    pub chat_id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_u32")]
    pub duration: Option<u32>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub is_group_msg: bool,
    #[serde(default)]
    pub reactions: Option<serde_json::Value>,
}

impl TransportMessage {
    /// The allow-listed content kind, or `None` for system/protocol messages.
    pub fn content_kind(&self) -> Option<ContentKind> {
        self.kind.as_deref().and_then(ContentKind::parse)
    }

    /// Push-to-talk, generic audio, or anything with an `audio/*` mimetype.
    pub fn is_voice(&self) -> bool {
        let kind = self.kind.as_deref().unwrap_or_default().to_ascii_lowercase();
        let mime = self
            .mimetype
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        kind == "ptt" || kind == "audio" || mime.starts_with("audio/")
    }

    /// Timestamp in milliseconds, falling back to `now_ms` when the transport sent none.
    pub fn timestamp_ms(&self, now_ms: i64) -> i64 {
        if self.timestamp > 0 {
            self.timestamp * 1000
        } else {
            now_ms
        }
    }

    /// Non-empty body, else non-empty caption.
    pub fn text(&self) -> Option<&str> {
        non_empty(self.body.as_deref()).or_else(|| non_empty(self.caption.as_deref()))
    }

    /// Text, or a `[Voice]` / `[Media]` placeholder.
    pub fn text_or_placeholder(&self) -> String {
        match self.text() {
            Some(t) => t.to_string(),
            None if self.is_voice() => placeholders::VOICE.to_string(),
            None => placeholders::MEDIA.to_string(),
        }
    }

    /// The raw type string for file-bearing kinds; `None` for text and push-to-talk.
    pub fn file_type(&self) -> Option<String> {
        match self.content_kind() {
            Some(kind) if kind.is_file() => self.kind.clone(),
            _ => None,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn de_chat_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(chat_id_from_value(value.as_ref()).unwrap_or_default())
}

/// Extract a chat id from either a string or a `{ "_serialized": ... }` object.
pub fn chat_id_from_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("_serialized")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn de_lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A chat as listed by the transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportChat {
    #[serde(default, deserialize_with = "de_chat_id")]
    pub id: String,
    #[serde(default)]
    pub is_group: bool,
    /// Last activity in epoch seconds (`t` on the wire).
    #[serde(rename = "t", default)]
    pub last_activity: i64,
}

/// A message row as persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub chat_id: String,
    pub external_id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp_ms: i64,
    pub is_voice: bool,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub duration: Option<u32>,
    pub is_voice_transcription: bool,
    pub failed_transcription: bool,
    pub reactions: Option<serde_json::Value>,
}

impl StoredMessage {
    /// A plain text row with all flags cleared.
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        chat_id: impl Into<String>,
        external_id: MessageId,
        role: Role,
        content: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            user_id,
            session_id,
            chat_id: chat_id.into(),
            external_id,
            role,
            content: content.into(),
            timestamp_ms,
            is_voice: false,
            file_type: None,
            file_name: None,
            duration: None,
            is_voice_transcription: false,
            failed_transcription: false,
            reactions: None,
        }
    }

    /// Map a transport history message into a row, as done by both sync paths.
    ///
    /// Returns `None` for non-allow-listed kinds and messages without an id.
    pub fn from_history(
        user_id: &UserId,
        session_id: &SessionId,
        chat_id: &str,
        msg: &TransportMessage,
    ) -> Option<Self> {
        if msg.id.is_empty() {
            return None;
        }
        msg.content_kind()?;
        let role = if msg.from_me {
            Role::Assistant
        } else {
            Role::User
        };
        let mut row = Self::new(
            user_id.clone(),
            session_id.clone(),
            chat_id,
            MessageId(msg.id.clone()),
            role,
            msg.text_or_placeholder(),
            msg.timestamp * 1000,
        );
        row.is_voice = msg.is_voice();
        row.file_type = msg.file_type();
        row.file_name = msg.filename.clone();
        row.duration = msg.duration;
        row.reactions = msg.reactions.clone();
        Some(row)
    }
}

/// Result of inserting a message keyed by `(session, external_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key already existed; treated as already persisted.
    Duplicate,
}

/// Message shape pushed to UI clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
    pub is_voice: bool,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub duration: Option<u32>,
    pub is_voice_transcription: bool,
    pub failed: bool,
    pub reactions: Option<serde_json::Value>,
}

impl From<&StoredMessage> for MessageView {
    fn from(m: &StoredMessage) -> Self {
        Self {
            id: m.external_id.0.clone(),
            role: m.role,
            content: m.content.clone(),
            timestamp: m.timestamp_ms,
            is_voice: m.is_voice,
            file_type: m.file_type.clone(),
            file_name: m.file_name.clone(),
            duration: m.duration,
            is_voice_transcription: m.is_voice_transcription,
            failed: m.failed_transcription,
            reactions: m.reactions.clone(),
        }
    }
}
