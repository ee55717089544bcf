// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport: one authenticated WhatsApp connection per session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::WadeskError;
use crate::events::TransportEvent;
use crate::message::{TransportChat, TransportMessage};
use crate::types::{MessageId, SessionId};

/// Operations on a live session connection.
///
/// Implementations report a dead connection as [`WadeskError::TransportClosed`]
/// so that long-running callers can abort instead of retrying per item.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId, WadeskError>;

    /// Send an image file from local disk with an optional caption.
    async fn send_image(
        &self,
        chat_id: &str,
        path: &str,
        file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError>;

    async fn send_file(
        &self,
        chat_id: &str,
        path: &str,
        file_name: &str,
        caption: &str,
    ) -> Result<MessageId, WadeskError>;

    async fn send_voice(&self, chat_id: &str, path: &str) -> Result<MessageId, WadeskError>;

    /// Download and decrypt the media attached to `message`.
    async fn decrypt_file(&self, message: &TransportMessage) -> Result<Vec<u8>, WadeskError>;

    async fn get_all_chats(&self) -> Result<Vec<TransportChat>, WadeskError>;

    /// Messages already present in the transport's local cache.
    async fn get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError>;

    /// Fetch the full remote history of a chat; may be slow.
    async fn load_and_get_all_messages_in_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<TransportMessage>, WadeskError>;

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &MessageId,
    ) -> Result<(), WadeskError>;

    /// React to a message; an empty `emoji` removes the reaction.
    async fn send_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<(), WadeskError>;

    async fn close(&self) -> Result<(), WadeskError>;
}

/// Creates transport clients for sessions.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Connect `session` and route its events into `events`.
    ///
    /// The returned client stays usable until `close` is called or the
    /// connection reports a terminal state.
    async fn create(
        &self,
        session: &SessionId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn TransportClient>, WadeskError>;
}
