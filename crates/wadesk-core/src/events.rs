// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events flowing out to UI clients and in from the chat transport.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{MessageView, TransportMessage};
use crate::records::{ContactDetails, ScheduledCall};
use crate::settings::AiSettings;
use crate::types::{Label, SessionStatus};

/// Phone → mute expiry in epoch ms (`None` = forever).
pub type MuteMap = BTreeMap<String, Option<i64>>;

/// Chat id → label, for one session.
pub type LabelMap = BTreeMap<String, Label>;

/// One entry of the `init` session list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
}

/// Contact fields as shown to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub name: Option<String>,
    pub field: Option<String>,
    pub notes: Option<String>,
}

/// Every message the server pushes to UI clients.
///
/// Serialized as a JSON object tagged by `type`, with camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RealtimeEvent {
    Init {
        sessions: Vec<SessionSummary>,
        blacklist: MuteMap,
        contacts: BTreeMap<String, ContactSummary>,
        settings: AiSettings,
        /// Session → chat → label.
        labels: BTreeMap<String, LabelMap>,
    },
    SessionStatusUpdate {
        session_id: String,
        /// A [`SessionStatus`] name or a `STREAM_<state>` marker.
        status: String,
    },
    QrCode {
        session_id: String,
        qr: String,
    },
    NewMessage {
        session_id: String,
        chat_id: String,
        phone_number: String,
        message: MessageView,
    },
    Transcription {
        session_id: String,
        chat_id: String,
        transcript: String,
        original_message_id: String,
    },
    TranscriptionFailed {
        session_id: String,
        chat_id: String,
        original_message_id: String,
        error: String,
    },
    LabelUpdated {
        session_id: String,
        chat_id: String,
        label: Label,
    },
    MuteUpdated {
        blacklist: MuteMap,
    },
    ContactUpdated {
        phone_number: String,
        details: ContactDetails,
    },
    CallScheduled {
        session_id: String,
        chat_id: String,
        details: ScheduledCall,
    },
    CallUpdated {
        session_id: String,
        chat_id: String,
        details: ScheduledCall,
    },
    InitialSyncComplete {
        session_id: String,
        chats_processed: usize,
        messages_processed: usize,
    },
    HistoryData {
        session_id: String,
        chat_id: String,
        messages: Vec<MessageView>,
    },
    AllChatsHistoryData {
        session_id: String,
        chats: BTreeMap<String, Vec<MessageView>>,
        labels: LabelMap,
    },
    FullHistoryLoading {
        session_id: String,
        chat_id: String,
    },
    FullHistoryData {
        session_id: String,
        chat_id: String,
        messages: Vec<MessageView>,
    },
    FullHistoryError {
        session_id: String,
        chat_id: String,
        error: String,
    },
    MessageSent {
        temp_id: Option<Value>,
        final_id: String,
        final_timestamp: i64,
    },
    MessageSendError {
        error: String,
        temp_id: Option<Value>,
    },
    MessageDeleted {
        success: bool,
        chat_id: String,
        message_id: String,
    },
    MessageDeleteError {
        error: String,
        chat_id: String,
        message_id: String,
    },
    ReactionSent {
        success: bool,
        chat_id: String,
        message_id: String,
        reaction: String,
    },
    ReactionSendError {
        error: String,
        chat_id: String,
        message_id: String,
    },
    AiStateConfirmed {
        enabled: bool,
    },
    AiSettingsData {
        settings: AiSettings,
    },
    AiSettingsUpdated {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ScheduledCallData {
        session_id: String,
        chat_id: String,
        call_info: Option<ScheduledCall>,
    },
    Error {
        message: String,
    },
}

impl RealtimeEvent {
    pub fn status(session_id: impl Into<String>, status: SessionStatus) -> Self {
        Self::SessionStatusUpdate {
            session_id: session_id.into(),
            status: status.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// JSON text frame for the websocket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"serialization failed: {e}"}}"#)
        })
    }
}

/// Events emitted by a transport client into its session's channel.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message(TransportMessage),
    /// Raw status string as reported by the automation engine.
    StateChanged(String),
    StreamChanged(String),
    Qr { data: String, attempt: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_camel_case_wire_format() {
        let ev = RealtimeEvent::InitialSyncComplete {
            session_id: "s1".into(),
            chats_processed: 3,
            messages_processed: 40,
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "type": "initialSyncComplete",
                "sessionId": "s1",
                "chatsProcessed": 3,
                "messagesProcessed": 40
            })
        );
    }

    #[test]
    fn status_helper_uses_wire_names() {
        let ev = RealtimeEvent::status("s1", SessionStatus::Closed);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "sessionStatusUpdate");
        assert_eq!(v["status"], "CLOSED");
    }

    #[test]
    fn mute_map_serializes_forever_as_null() {
        let mut blacklist = MuteMap::new();
        blacklist.insert("972501234567".into(), None);
        blacklist.insert("972509999999".into(), Some(1_700_000_000_000));
        let v = serde_json::to_value(RealtimeEvent::MuteUpdated { blacklist }).unwrap();
        assert_eq!(v["blacklist"]["972501234567"], json!(null));
        assert_eq!(v["blacklist"]["972509999999"], json!(1_700_000_000_000i64));
    }

    #[test]
    fn settings_updated_omits_missing_error() {
        let v = serde_json::to_value(RealtimeEvent::AiSettingsUpdated {
            success: true,
            error: None,
        })
        .unwrap();
        assert!(v.get("error").is_none());
    }
}
