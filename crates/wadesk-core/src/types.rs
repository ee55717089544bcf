// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across traits and the wadesk engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WadeskError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Name of one WhatsApp-linked session (unique across the process).
    SessionId
);
string_id!(
    /// Identifier of the tenant user owning sessions.
    UserId
);
string_id!(
    /// Identifier assigned by the chat transport; the dedupe key for messages.
    MessageId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Llm,
    Storage,
    Transcriber,
}

/// Connection status of a session as reported by the transport.
///
/// `Closed` and `ErrorCreate` are never produced by the transport itself;
/// the orchestrator emits them after teardown or a failed creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Initializing,
    QrPending,
    Connected,
    Syncing,
    Active,
    Conflict,
    Unlaunched,
    Unpaired,
    UnpairedIdle,
    Disconnected,
    Closed,
    ErrorCreate,
}

impl SessionStatus {
    /// Terminal states tear the session down; nothing leaves them except recreation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Conflict
                | Self::Unlaunched
                | Self::Unpaired
                | Self::UnpairedIdle
                | Self::Disconnected
                | Self::Closed
                | Self::ErrorCreate
        )
    }

    /// Parse a raw status string from the automation engine.
    ///
    /// Accepts the canonical names plus the engine's login-progress aliases.
    /// Returns `None` for informational statuses that do not move the state machine.
    pub fn from_transport(raw: &str) -> Option<Self> {
        match raw {
            "isLogged" | "qrReadSuccess" | "successChat" | "inChat" | "chatsAvailable" => {
                Some(Self::Connected)
            }
            "notLogged" | "qrReadError" | "qrReadFail" | "desconnectedMobile" => {
                Some(Self::QrPending)
            }
            "autocloseCalled" => Some(Self::Unlaunched),
            "browserClose" | "serverClose" => Some(Self::Disconnected),
            "initBrowser" | "openBrowser" | "initWhatsapp" => Some(Self::Initializing),
            other => other.parse().ok(),
        }
    }
}

/// Pipeline label attached to every chat.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    New,
    InProgress,
    Paid,
    Waiting,
    NotInterested,
}

/// Author of a persisted message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content types the pipeline and the synchronizer accept.
///
/// Anything else the transport reports (protocol notifications, e2e notices,
/// call logs) is dropped before it reaches persistence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Chat,
    Ptt,
    Image,
    Video,
    Document,
    Audio,
    Location,
    Vcard,
}

impl ContentKind {
    /// Parse a raw transport type; `None` means "not on the allow-list".
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// Whether this kind carries a stored file (everything except text and push-to-talk).
    pub fn is_file(self) -> bool {
        !matches!(self, Self::Chat | Self::Ptt)
    }
}

/// How long a mute lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteDuration {
    Forever,
    Hours(u32),
}

impl MuteDuration {
    /// Parse the duration as sent by UI clients: `"forever"`, `null`, or a positive hour count
    /// given as a number or a numeric string.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, WadeskError> {
        let invalid = || WadeskError::Validation(format!("invalid mute duration: {value}"));
        match value {
            serde_json::Value::Null => Ok(Self::Forever),
            serde_json::Value::String(s) if s == "forever" => Ok(Self::Forever),
            serde_json::Value::String(s) => match s.trim().parse::<u32>() {
                Ok(h) if h > 0 => Ok(Self::Hours(h)),
                _ => Err(invalid()),
            },
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(h) if h > 0 && h <= u64::from(u32::MAX) => Ok(Self::Hours(h as u32)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    /// Expiry instant in epoch milliseconds, `None` for forever.
    pub fn expires_at(self, now_ms: i64) -> Option<i64> {
        match self {
            Self::Forever => None,
            Self::Hours(h) => Some(now_ms + i64::from(h) * 3_600_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        for s in [
            SessionStatus::Conflict,
            SessionStatus::Unlaunched,
            SessionStatus::Unpaired,
            SessionStatus::UnpairedIdle,
            SessionStatus::Disconnected,
        ] {
            assert!(s.is_terminal(), "{s} should be terminal");
        }
        for s in [
            SessionStatus::Initializing,
            SessionStatus::QrPending,
            SessionStatus::Connected,
            SessionStatus::Syncing,
            SessionStatus::Active,
        ] {
            assert!(!s.is_terminal(), "{s} should not be terminal");
        }
    }

    #[test]
    fn session_status_wire_names() {
        assert_eq!(SessionStatus::UnpairedIdle.to_string(), "UNPAIRED_IDLE");
        assert_eq!(SessionStatus::ErrorCreate.to_string(), "ERROR_CREATE");
        assert_eq!(
            serde_json::to_string(&SessionStatus::QrPending).unwrap(),
            "\"QR_PENDING\""
        );
    }

    #[test]
    fn session_status_from_transport_aliases() {
        assert_eq!(
            SessionStatus::from_transport("isLogged"),
            Some(SessionStatus::Connected)
        );
        assert_eq!(
            SessionStatus::from_transport("CONFLICT"),
            Some(SessionStatus::Conflict)
        );
        assert_eq!(
            SessionStatus::from_transport("unpaired_idle"),
            Some(SessionStatus::UnpairedIdle)
        );
        assert_eq!(SessionStatus::from_transport("waitForLogin"), None);
    }

    #[test]
    fn label_wire_names_and_default() {
        assert_eq!(Label::default(), Label::New);
        assert_eq!(Label::InProgress.to_string(), "inprogress");
        assert_eq!("notinterested".parse::<Label>().unwrap(), Label::NotInterested);
        assert!("archived".parse::<Label>().is_err());
    }

    #[test]
    fn content_kind_allow_list() {
        assert_eq!(ContentKind::parse("PTT"), Some(ContentKind::Ptt));
        assert_eq!(ContentKind::parse("vcard"), Some(ContentKind::Vcard));
        assert_eq!(ContentKind::parse("e2e_notification"), None);
        assert_eq!(ContentKind::parse("notification_template"), None);
        assert!(ContentKind::Image.is_file());
        assert!(!ContentKind::Ptt.is_file());
    }

    #[test]
    fn mute_duration_parsing() {
        use serde_json::json;
        assert_eq!(
            MuteDuration::from_value(&json!("forever")).unwrap(),
            MuteDuration::Forever
        );
        assert_eq!(
            MuteDuration::from_value(&json!(null)).unwrap(),
            MuteDuration::Forever
        );
        assert_eq!(
            MuteDuration::from_value(&json!(8)).unwrap(),
            MuteDuration::Hours(8)
        );
        assert_eq!(
            MuteDuration::from_value(&json!("24")).unwrap(),
            MuteDuration::Hours(24)
        );
        assert!(MuteDuration::from_value(&json!(0)).is_err());
        assert!(MuteDuration::from_value(&json!("soon")).is_err());
        assert_eq!(MuteDuration::Hours(2).expires_at(1_000), Some(7_201_000));
        assert_eq!(MuteDuration::Forever.expires_at(1_000), None);
    }

    #[test]
    fn ids_display_and_serialize_transparently() {
        let sid = SessionId::from("shop-1");
        assert_eq!(sid.to_string(), "shop-1");
        assert_eq!(serde_json::to_string(&sid).unwrap(), "\"shop-1\"");
    }
}
