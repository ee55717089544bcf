// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History synchronization from the transport cache into storage.
//!
//! Both the post-connect sync and the on-demand full-history load take the
//! per-session [`SyncGuard`], so at most one of them runs per session.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use wadesk_core::phone::is_direct_chat;
use wadesk_core::{
    RealtimeEvent, SessionId, StoredMessage, TransportChat, TransportClient, UserId, WadeskError,
};

use crate::deps::EngineDeps;

/// Sessions with a sync in flight.
#[derive(Debug, Clone, Default)]
pub struct SyncGuards {
    active: Arc<DashMap<SessionId, ()>>,
}

impl SyncGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `session`, or fail with [`WadeskError::SyncInProgress`].
    pub fn acquire(&self, session: &SessionId) -> Result<SyncGuard, WadeskError> {
        match self.active.entry(session.clone()) {
            Entry::Occupied(_) => Err(WadeskError::SyncInProgress {
                session: session.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(SyncGuard {
                    active: Arc::clone(&self.active),
                    session: session.clone(),
                })
            }
        }
    }

    pub fn is_running(&self, session: &SessionId) -> bool {
        self.active.contains_key(session)
    }
}

/// Released on drop, whichever way the sync ends.
#[derive(Debug)]
pub struct SyncGuard {
    active: Arc<DashMap<SessionId, ()>>,
    session: SessionId,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.active.remove(&self.session);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub chats_processed: usize,
    pub messages_processed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BatchTally {
    pub batches: usize,
    pub stored: usize,
}

pub struct HistorySync {
    deps: EngineDeps,
    guards: SyncGuards,
}

impl HistorySync {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            deps,
            guards: SyncGuards::new(),
        }
    }

    pub fn guards(&self) -> &SyncGuards {
        &self.guards
    }

    /// Pull the cached history of the most recent direct chats.
    ///
    /// A closed transport aborts the run. Any other per-chat failure skips that chat.
    pub async fn initial_sync(
        &self,
        transport: &dyn TransportClient,
        user: &UserId,
        session: &SessionId,
    ) -> Result<SyncReport, WadeskError> {
        let _guard = self.guards.acquire(session)?;
        let cfg = &self.deps.config.sync;
        info!(session_id = %session, "initial sync started");

        let mut chats: Vec<TransportChat> = transport
            .get_all_chats()
            .await?
            .into_iter()
            .filter(|c| is_direct_chat(&c.id, c.is_group))
            .collect();

        let ids: Vec<String> = chats.iter().map(|c| c.id.clone()).collect();
        let chats_processed = match self
            .deps
            .store
            .ensure_default_labels(user, session, &ids)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                warn!(session_id = %session, error = %e, "failed to seed default labels");
                ids.len()
            }
        };

        chats.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        chats.truncate(cfg.recent_chat_count);

        let mut rows = Vec::new();
        for chat in &chats {
            match transport.get_all_messages_in_chat(&chat.id).await {
                Ok(messages) => rows.extend(
                    messages
                        .iter()
                        .filter_map(|m| StoredMessage::from_history(user, session, &chat.id, m)),
                ),
                Err(e) if e.is_transport_closed() => {
                    warn!(session_id = %session, error = %e, "transport closed during sync");
                    return Err(e);
                }
                Err(e) => {
                    warn!(session_id = %session, chat_id = %chat.id, error = %e, "skipping chat");
                }
            }
            tokio::time::sleep(Duration::from_millis(cfg.chat_delay_ms)).await;
        }

        let tally = self.upsert_batches(session, &rows).await;
        let report = SyncReport {
            chats_processed,
            messages_processed: tally.stored,
        };
        info!(
            session_id = %session,
            chats = report.chats_processed,
            messages = report.messages_processed,
            "initial sync complete"
        );
        self.deps.fanout.send_to_user(
            user,
            RealtimeEvent::InitialSyncComplete {
                session_id: session.to_string(),
                chats_processed: report.chats_processed,
                messages_processed: report.messages_processed,
            },
        );
        Ok(report)
    }

    /// Load the entire remote history of one chat, store it, and return it oldest first.
    pub async fn full_history(
        &self,
        transport: &dyn TransportClient,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<Vec<StoredMessage>, WadeskError> {
        let (rows, _) = self
            .store_full_history(transport, user, session, chat_id)
            .await?;
        Ok(rows)
    }

    pub(crate) async fn store_full_history(
        &self,
        transport: &dyn TransportClient,
        user: &UserId,
        session: &SessionId,
        chat_id: &str,
    ) -> Result<(Vec<StoredMessage>, BatchTally), WadeskError> {
        let _guard = self.guards.acquire(session)?;
        let messages = transport.load_and_get_all_messages_in_chat(chat_id).await?;
        let mut rows: Vec<StoredMessage> = messages
            .iter()
            .filter_map(|m| StoredMessage::from_history(user, session, chat_id, m))
            .collect();

        let tally = self.upsert_batches(session, &rows).await;
        debug!(
            session_id = %session,
            chat_id,
            batches = tally.batches,
            stored = tally.stored,
            "full history stored"
        );
        rows.sort_by_key(|m| m.timestamp_ms);
        Ok((rows, tally))
    }

    pub(crate) async fn upsert_batches(
        &self,
        session: &SessionId,
        rows: &[StoredMessage],
    ) -> BatchTally {
        let mut tally = BatchTally::default();
        for batch in rows.chunks(self.deps.config.sync.batch_size.max(1)) {
            tally.batches += 1;
            match self.deps.store.upsert_messages(batch).await {
                Ok(n) => tally.stored += n,
                Err(e) => warn!(
                    session_id = %session,
                    batch = tally.batches,
                    error = %e,
                    "batch upsert failed, skipping"
                ),
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadesk_core::PersistenceGateway;
    use wadesk_test_utils::{FetchFailure, MockTransport, TestHarness};

    use crate::testing::deps;

    fn user() -> UserId {
        UserId::from("u1")
    }

    fn session() -> SessionId {
        SessionId::from("s1")
    }

    fn chat(id: &str, is_group: bool, t: i64) -> TransportChat {
        TransportChat {
            id: id.into(),
            is_group,
            last_activity: t,
        }
    }

    fn text(id: &str, chat: &str, ts: i64) -> wadesk_core::TransportMessage {
        wadesk_core::TransportMessage {
            id: id.into(),
            chat_id: chat.into(),
            kind: Some("chat".into()),
            body: Some(format!("body {id}")),
            timestamp: ts,
            ..Default::default()
        }
    }

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let guards = SyncGuards::new();
        let first = guards.acquire(&session()).unwrap();
        assert!(matches!(
            guards.acquire(&session()),
            Err(WadeskError::SyncInProgress { .. })
        ));
        assert!(guards.acquire(&SessionId::from("s2")).is_ok());
        drop(first);
        assert!(!guards.is_running(&session()));
        assert!(guards.acquire(&session()).is_ok());
    }

    #[tokio::test]
    async fn initial_sync_skips_groups_and_is_idempotent() {
        let harness = TestHarness::builder().build().await.unwrap();
        let sync = HistorySync::new(deps(&harness));
        let transport = MockTransport::default();
        transport
            .set_chats(vec![
                chat("111@c.us", false, 10),
                chat("222@c.us", false, 20),
                chat("333@g.us", true, 30),
                chat("status@broadcast", false, 40),
            ])
            .await;
        transport
            .set_cached_messages("111@c.us", vec![text("a", "111@c.us", 1), text("b", "111@c.us", 2)])
            .await;
        transport
            .set_cached_messages(
                "222@c.us",
                vec![text("c", "222@c.us", 3), wadesk_core::TransportMessage::default()],
            )
            .await;

        let report = sync.initial_sync(&transport, &user(), &session()).await.unwrap();
        assert_eq!(report.chats_processed, 2);
        assert_eq!(report.messages_processed, 3);
        assert_eq!(harness.storage.count_messages(&session()).await.unwrap(), 3);

        sync.initial_sync(&transport, &user(), &session()).await.unwrap();
        assert_eq!(harness.storage.count_messages(&session()).await.unwrap(), 3);
        assert_eq!(harness.fanout.count_of("initialSyncComplete"), 2);
    }

    #[tokio::test]
    async fn closed_transport_aborts_other_errors_skip() {
        let harness = TestHarness::builder().build().await.unwrap();
        let sync = HistorySync::new(deps(&harness));
        let transport = MockTransport::default();
        transport
            .set_chats(vec![chat("111@c.us", false, 20), chat("222@c.us", false, 10)])
            .await;
        transport.fail_fetch("111@c.us", FetchFailure::Error).await;
        transport
            .set_cached_messages("222@c.us", vec![text("c", "222@c.us", 3)])
            .await;

        let report = sync.initial_sync(&transport, &user(), &session()).await.unwrap();
        assert_eq!(report.messages_processed, 1);

        transport.fail_fetch("111@c.us", FetchFailure::Closed).await;
        let err = sync.initial_sync(&transport, &user(), &session()).await.unwrap_err();
        assert!(err.is_transport_closed());
        assert!(!sync.guards().is_running(&session()));
    }

    #[tokio::test]
    async fn full_history_batches_and_sorts() {
        let harness = TestHarness::builder().build().await.unwrap();
        let sync = HistorySync::new(deps(&harness));
        let transport = MockTransport::default();
        let chat_id = "111@c.us";
        let history: Vec<_> = (0..500)
            .rev()
            .map(|n| text(&format!("m{n}"), chat_id, 1_000 + n))
            .collect();
        transport.set_full_history(chat_id, history).await;

        let (rows, tally) = sync
            .store_full_history(&transport, &user(), &session(), chat_id)
            .await
            .unwrap();
        assert_eq!(tally, BatchTally { batches: 10, stored: 500 });
        assert_eq!(rows.len(), 500);
        assert!(rows.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
        assert_eq!(harness.storage.count_messages(&session()).await.unwrap(), 500);

        let again = sync
            .full_history(&transport, &user(), &session(), chat_id)
            .await
            .unwrap();
        assert_eq!(again.len(), 500);
        assert_eq!(harness.storage.count_messages(&session()).await.unwrap(), 500);
    }
}
