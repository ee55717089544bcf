// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wadesk session engine.
//!
//! Holds the error type, the domain model, and the collaborator traits the
//! engine is written against. Storage, LLM, transport and transcription
//! backends implement the traits defined here.

pub mod chat;
pub mod error;
pub mod events;
pub mod message;
pub mod phone;
pub mod records;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::WadeskError;
pub use events::{RealtimeEvent, TransportEvent};
pub use message::{InsertOutcome, MessageView, StoredMessage, TransportChat, TransportMessage};
pub use settings::AiSettings;
pub use types::{
    AdapterType, ContentKind, HealthStatus, Label, MessageId, MuteDuration, Role, SessionId,
    SessionStatus, UserId,
};

pub use traits::{
    FanOut, LlmProvider, PersistenceGateway, PluginAdapter, Transcriber, TransportClient,
    TransportFactory,
};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
