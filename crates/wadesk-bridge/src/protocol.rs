// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types shared with the automation sidecar.
//!
//! Requests are JSON over HTTP under `/sessions/{session}/...`. Events arrive
//! on a websocket as `{"event": "message"|"state"|"stream"|"qr", "data": ...}`.

use serde::{Deserialize, Serialize};
use wadesk_core::{TransportEvent, TransportMessage, WadeskError};

/// Error fragments the sidecar reports once the browser target is gone.
const CLOSED_MARKERS: [&str; 3] = ["Protocol error", "Target closed", "Session closed"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextBody<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFileBody<'a> {
    pub chat_id: &'a str,
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionBody<'a> {
    pub message_id: &'a str,
    pub emoji: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DecryptBody<'a> {
    pub message: &'a TransportMessage,
}

/// Response to every send operation.
#[derive(Debug, Deserialize)]
pub struct SentResponse {
    pub id: serde_json::Value,
}

impl SentResponse {
    /// The id as a string, accepting the `{_serialized}` form.
    pub fn message_id(&self) -> Option<String> {
        wadesk_core::message::chat_id_from_value(Some(&self.id))
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

/// Classify a sidecar failure text: a dead browser target closes the transport.
pub fn classify_error(message: String) -> WadeskError {
    if CLOSED_MARKERS.iter().any(|m| message.contains(m)) {
        WadeskError::TransportClosed(message)
    } else {
        WadeskError::channel(message)
    }
}

#[derive(Debug, Deserialize)]
struct EventFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct QrData {
    #[serde(alias = "base64Qr", alias = "base64")]
    qr: String,
    #[serde(default)]
    attempt: u32,
}

/// Decode one websocket text frame. Unknown event names yield `Ok(None)`.
pub fn parse_event(text: &str) -> Result<Option<TransportEvent>, serde_json::Error> {
    let frame: EventFrame = serde_json::from_str(text)?;
    let event = match frame.event.as_str() {
        "message" => Some(TransportEvent::Message(serde_json::from_value(frame.data)?)),
        "state" => frame.data.as_str().map(|s| TransportEvent::StateChanged(s.to_string())),
        "stream" => frame.data.as_str().map(|s| TransportEvent::StreamChanged(s.to_string())),
        "qr" => {
            let qr: QrData = serde_json::from_value(frame.data)?;
            Some(TransportEvent::Qr {
                data: qr.qr,
                attempt: qr.attempt,
            })
        }
        _ => None,
    };
    Ok(event)
}
