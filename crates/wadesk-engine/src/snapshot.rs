// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshots pushed to a user on connect and after a sync.

use std::collections::BTreeMap;

use tracing::warn;
use wadesk_core::events::{ContactSummary, SessionSummary};
use wadesk_core::{MessageView, RealtimeEvent, SessionId, SessionStatus, UserId};

use crate::deps::EngineDeps;

/// The `init` event: sessions, mutes, contacts, settings and labels of `user`.
///
/// `live` reports the in-memory status of running sessions; it wins over the
/// stored one.
pub async fn init_snapshot<F>(deps: &EngineDeps, user: &UserId, live: F) -> RealtimeEvent
where
    F: Fn(&SessionId) -> Option<SessionStatus>,
{
    let store = &deps.store;
    let sessions = store
        .list_user_sessions(user)
        .await
        .unwrap_or_else(|e| {
            warn!(user_id = %user, error = %e, "failed to list sessions");
            Vec::new()
        })
        .into_iter()
        .map(|record| {
            let status = live(&record.session_id).or(record.status);
            SessionSummary {
                id: record.session_id.to_string(),
                name: record.session_id.to_string(),
                status: Some(status.map_or_else(|| "unknown".to_string(), |s| s.to_string())),
            }
        })
        .collect();

    let blacklist = store.user_mutes(user).await.unwrap_or_else(|e| {
        warn!(user_id = %user, error = %e, "failed to load mutes");
        BTreeMap::new()
    });
    let contacts = store
        .user_contacts(user)
        .await
        .unwrap_or_else(|e| {
            warn!(user_id = %user, error = %e, "failed to load contacts");
            Vec::new()
        })
        .into_iter()
        .map(|c| {
            (
                c.phone,
                ContactSummary {
                    name: c.contact_name,
                    field: c.business_field,
                    notes: c.notes,
                },
            )
        })
        .collect();
    let labels = store.user_labels(user).await.unwrap_or_else(|e| {
        warn!(user_id = %user, error = %e, "failed to load labels");
        BTreeMap::new()
    });

    RealtimeEvent::Init {
        sessions,
        blacklist,
        contacts,
        settings: deps.settings_for(user).await,
        labels,
    }
}

/// `allChatsHistoryData` for one session.
pub async fn session_snapshot(
    deps: &EngineDeps,
    user: &UserId,
    session: &SessionId,
) -> RealtimeEvent {
    let chats = deps
        .store
        .session_history(user, session)
        .await
        .unwrap_or_else(|e| {
            warn!(session_id = %session, error = %e, "failed to load session history");
            BTreeMap::new()
        })
        .into_iter()
        .map(|(chat, rows)| (chat, rows.iter().map(MessageView::from).collect()))
        .collect();
    let labels = deps
        .store
        .user_labels(user)
        .await
        .ok()
        .and_then(|mut all| all.remove(session.as_str()))
        .unwrap_or_default();

    RealtimeEvent::AllChatsHistoryData {
        session_id: session.to_string(),
        chats,
        labels,
    }
}

/// `allChatsHistoryData` for every session of `user`.
pub async fn history_snapshots(deps: &EngineDeps, user: &UserId) -> Vec<RealtimeEvent> {
    let sessions = match deps.store.list_user_sessions(user).await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(user_id = %user, error = %e, "failed to list sessions");
            return Vec::new();
        }
    };
    let mut events = Vec::with_capacity(sessions.len());
    for record in sessions {
        events.push(session_snapshot(deps, user, &record.session_id).await);
    }
    events
}
