// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry, contact and scheduled-call records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{SessionId, SessionStatus, UserId};

/// A registered session and its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub status: Option<SessionStatus>,
    pub last_activity_at: Option<i64>,
}

/// A contact keyed by `(user, normalized phone)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub contact_name: Option<String>,
    pub business_field: Option<String>,
    pub notes: Option<String>,
}

/// A partial contact update.
///
/// `None` leaves the column untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_field: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl ContactDetails {
    /// Build from raw client/tool strings; blank values clear the field.
    pub fn from_raw(
        contact_name: Option<&str>,
        business_field: Option<&str>,
        notes: Option<&str>,
    ) -> Self {
        fn clean(v: Option<&str>) -> Option<Option<String>> {
            v.map(|s| Some(s.trim().to_string()).filter(|s| !s.is_empty()))
        }
        Self {
            contact_name: clean(contact_name),
            business_field: clean(business_field),
            notes: clean(notes),
        }
    }

    /// Parse `{contact_name?, business_field?, notes?}`; non-string values are ignored.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let get = |k: &str| value.get(k).and_then(|v| v.as_str());
        Self::from_raw(get("contact_name"), get("business_field"), get("notes"))
    }

    pub fn is_empty(&self) -> bool {
        self.contact_name.is_none() && self.business_field.is_none() && self.notes.is_none()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Completed,
    Cancelled,
}

/// A callback request captured by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCall {
    pub id: i64,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub chat_id: String,
    pub callback_phone: String,
    pub customer_name: Option<String>,
    pub requested_time_text: String,
    pub status: CallStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload for a new pending call.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduledCall {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub chat_id: String,
    pub callback_phone: String,
    pub customer_name: Option<String>,
    pub requested_time_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_details_blank_clears_and_missing_skips() {
        let d = ContactDetails::from_value(&json!({
            "contact_name": "  Dana ",
            "notes": "",
            "business_field": 5
        }));
        assert_eq!(d.contact_name, Some(Some("Dana".into())));
        assert_eq!(d.notes, Some(None));
        assert_eq!(d.business_field, None);

        let wire = serde_json::to_value(&d).unwrap();
        assert_eq!(wire, json!({ "contact_name": "Dana", "notes": null }));
    }

    #[test]
    fn empty_details() {
        assert!(ContactDetails::from_value(&json!({})).is_empty());
    }

    #[test]
    fn call_status_names() {
        assert_eq!(CallStatus::Pending.to_string(), "pending");
        assert_eq!("cancelled".parse::<CallStatus>().unwrap(), CallStatus::Cancelled);
    }
}
