// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persist-then-fan-out helpers shared by the pipeline, the orchestrator and chat ops.

use tracing::{info, warn};
use wadesk_core::{
    InsertOutcome, MessageView, RealtimeEvent, Role, StoredMessage, TransportClient, WadeskError,
};

use crate::deps::{ChatTarget, EngineDeps};

/// Store `message` and push it to the owner as `newMessage`.
///
/// Storage failures are logged and the event is still pushed.
pub(crate) async fn record(
    deps: &EngineDeps,
    target: &ChatTarget,
    message: &StoredMessage,
) -> Option<InsertOutcome> {
    let outcome = match deps.store.insert_message(message).await {
        Ok(InsertOutcome::Duplicate) => {
            info!(
                session_id = %target.session,
                message_id = %message.external_id,
                "message already stored"
            );
            Some(InsertOutcome::Duplicate)
        }
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(
                session_id = %target.session,
                chat_id = %target.chat_id,
                error = %e,
                "failed to persist message"
            );
            None
        }
    };
    deps.fanout.send_to_user(&target.user, new_message_event(target, message));
    outcome
}

pub(crate) fn new_message_event(target: &ChatTarget, message: &StoredMessage) -> RealtimeEvent {
    RealtimeEvent::NewMessage {
        session_id: target.session.to_string(),
        chat_id: target.chat_id.clone(),
        phone_number: target.phone.clone(),
        message: MessageView::from(message),
    }
}

/// Send `text` as the assistant, then record the outbound row under the transport id.
pub(crate) async fn send_and_record(
    deps: &EngineDeps,
    transport: &dyn TransportClient,
    target: &ChatTarget,
    text: &str,
) -> Result<StoredMessage, WadeskError> {
    let id = transport.send_text(&target.chat_id, text).await?;
    let row = StoredMessage::new(
        target.user.clone(),
        target.session.clone(),
        target.chat_id.clone(),
        id,
        Role::Assistant,
        text,
        wadesk_core::now_ms(),
    );
    record(deps, target, &row).await;
    Ok(row)
}
