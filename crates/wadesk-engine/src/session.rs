// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session lifecycle: creation, the event worker loop and teardown.
//!
//! Sessions move through `INITIALIZING -> QR_PENDING -> CONNECTED -> SYNCING -> ACTIVE`.
//! Terminal states close the transport and drop the in-memory handle; only
//! a fresh [`SessionManager::start_session`] brings the session back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use wadesk_core::{
    RealtimeEvent, SessionId, SessionStatus, TransportClient, TransportEvent, TransportFactory,
    UserId,
};

use crate::deps::EngineDeps;
use crate::pipeline::{MessagePipeline, owner_of};
use crate::snapshot::{init_snapshot, session_snapshot};
use crate::sync::HistorySync;

/// Result of a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: SessionStatus, to: SessionStatus },
    /// The session was already in a terminal state.
    Rejected { from: SessionStatus, to: SessionStatus },
}

/// One live session.
pub struct SessionHandle {
    id: SessionId,
    owner: Option<UserId>,
    status: Mutex<SessionStatus>,
    transport: Arc<dyn TransportClient>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new(
        id: SessionId,
        owner: Option<UserId>,
        transport: Arc<dyn TransportClient>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            owner,
            status: Mutex::new(SessionStatus::Initializing),
            transport,
            cancel,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn transport(&self) -> Arc<dyn TransportClient> {
        Arc::clone(&self.transport)
    }

    /// Move to `to` unless the session already reached a terminal state.
    pub fn transition(&self, to: SessionStatus) -> Transition {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        let from = *status;
        if from.is_terminal() {
            return Transition::Rejected { from, to };
        }
        *status = to;
        Transition::Applied { from, to }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
    Failed,
}

pub struct SessionManager {
    deps: EngineDeps,
    factory: Arc<dyn TransportFactory>,
    pipeline: Arc<MessagePipeline>,
    sync: Arc<HistorySync>,
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
    starting: DashSet<SessionId>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl SessionManager {
    pub fn new(
        deps: EngineDeps,
        factory: Arc<dyn TransportFactory>,
        pipeline: Arc<MessagePipeline>,
        sync: Arc<HistorySync>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            deps,
            factory,
            pipeline,
            sync,
            sessions: DashMap::new(),
            starting: DashSet::new(),
            cancel,
            tasks: TaskTracker::new(),
        }
    }

    pub fn pipeline(&self) -> &Arc<MessagePipeline> {
        &self.pipeline
    }

    pub fn history(&self) -> &Arc<HistorySync> {
        &self.sync
    }

    pub fn transport(&self, session: &SessionId) -> Option<Arc<dyn TransportClient>> {
        self.sessions.get(session).map(|h| h.transport())
    }

    /// In-memory status of a running session.
    pub fn status(&self, session: &SessionId) -> Option<SessionStatus> {
        self.sessions.get(session).map(|h| h.status())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Connect `session` and spawn its worker loop.
    pub async fn start_session(self: &Arc<Self>, session: &SessionId) -> StartOutcome {
        if self.sessions.contains_key(session) || !self.starting.insert(session.clone()) {
            info!(session_id = %session, "session already active, ignoring start");
            return StartOutcome::AlreadyActive;
        }
        let outcome = self.create(session).await;
        self.starting.remove(session);
        outcome
    }

    async fn create(self: &Arc<Self>, session: &SessionId) -> StartOutcome {
        let owner = owner_of(&self.deps, session).await;
        self.publish_status(session, owner.as_ref(), SessionStatus::Initializing)
            .await;

        let (tx, rx) = mpsc::channel(self.deps.config.sessions.event_buffer.max(1));
        let transport = match self.factory.create(session, tx).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(session_id = %session, error = %e, "failed to create session");
                self.publish_status(session, owner.as_ref(), SessionStatus::ErrorCreate)
                    .await;
                return StartOutcome::Failed;
            }
        };

        let handle = Arc::new(SessionHandle::new(
            session.clone(),
            owner,
            transport,
            self.cancel.child_token(),
        ));
        self.sessions.insert(session.clone(), Arc::clone(&handle));
        self.tasks.spawn(Arc::clone(self).run_worker(handle, rx));
        info!(session_id = %session, "session started");
        StartOutcome::Started
    }

    async fn run_worker(
        self: Arc<Self>,
        handle: Arc<SessionHandle>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        loop {
            tokio::select! {
                _ = handle.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(&handle, event).await,
                    None => {
                        debug!(session_id = %handle.id, "event stream ended");
                        break;
                    }
                },
            }
            if handle.status().is_terminal() {
                break;
            }
        }
        debug!(session_id = %handle.id, "session worker stopped");
    }

    async fn handle_event(self: &Arc<Self>, handle: &Arc<SessionHandle>, event: TransportEvent) {
        match event {
            TransportEvent::Message(message) => {
                let outcome = self
                    .pipeline
                    .handle(&handle.id, handle.transport(), message)
                    .await;
                debug!(session_id = %handle.id, ?outcome, "message handled");
            }
            TransportEvent::StateChanged(raw) => match SessionStatus::from_transport(&raw) {
                Some(status) => self.apply_status(handle, status).await,
                None => {
                    debug!(session_id = %handle.id, state = %raw, "informational state");
                    self.emit(
                        handle.owner.as_ref(),
                        RealtimeEvent::SessionStatusUpdate {
                            session_id: handle.id.to_string(),
                            status: raw,
                        },
                    );
                }
            },
            TransportEvent::StreamChanged(state) => self.emit(
                handle.owner.as_ref(),
                RealtimeEvent::SessionStatusUpdate {
                    session_id: handle.id.to_string(),
                    status: format!("STREAM_{state}"),
                },
            ),
            TransportEvent::Qr { data, attempt } => {
                debug!(session_id = %handle.id, attempt, "QR code issued");
                self.emit(
                    handle.owner.as_ref(),
                    RealtimeEvent::QrCode {
                        session_id: handle.id.to_string(),
                        qr: data,
                    },
                );
                self.apply_status(handle, SessionStatus::QrPending).await;
            }
        }
    }

    /// Commit a status change and schedule the post-connect sync when due.
    async fn apply_status(self: &Arc<Self>, handle: &Arc<SessionHandle>, to: SessionStatus) {
        if let Transition::Applied { from, to } = self.commit(handle, to).await {
            let already_up = matches!(
                from,
                SessionStatus::Connected | SessionStatus::Syncing | SessionStatus::Active
            );
            if to == SessionStatus::Connected && !already_up {
                self.schedule_sync(Arc::clone(handle));
            }
        }
    }

    /// Transition, persist and fan out. A terminal state also tears the session down.
    async fn commit(&self, handle: &Arc<SessionHandle>, to: SessionStatus) -> Transition {
        let transition = handle.transition(to);
        match transition {
            Transition::Rejected { from, to } => {
                debug!(session_id = %handle.id, %from, %to, "transition out of terminal state rejected");
            }
            Transition::Applied { from, to } => {
                info!(session_id = %handle.id, %from, %to, "session status changed");
                self.publish_status(&handle.id, handle.owner.as_ref(), to)
                    .await;
                if to.is_terminal() {
                    self.teardown(handle).await;
                    if to != SessionStatus::Closed {
                        self.emit(
                            handle.owner.as_ref(),
                            RealtimeEvent::status(handle.id.as_str(), SessionStatus::Closed),
                        );
                    }
                }
            }
        }
        transition
    }

    async fn teardown(&self, handle: &Arc<SessionHandle>) {
        handle.cancel.cancel();
        if let Err(e) = handle.transport.close().await {
            warn!(session_id = %handle.id, error = %e, "failed to close transport");
        }
        self.sessions
            .remove_if(&handle.id, |_, current| Arc::ptr_eq(current, handle));
    }

    fn schedule_sync(self: &Arc<Self>, handle: Arc<SessionHandle>) {
        let this = Arc::clone(self);
        let delay = Duration::from_secs(self.deps.config.sync.connect_delay_secs);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = handle.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(user) = handle.owner.clone() else {
                warn!(session_id = %handle.id, "no owner, skipping initial sync");
                return;
            };

            this.commit(&handle, SessionStatus::Syncing).await;
            match this
                .sync
                .initial_sync(handle.transport.as_ref(), &user, &handle.id)
                .await
            {
                Ok(report) => debug!(session_id = %handle.id, ?report, "initial sync finished"),
                Err(e) => warn!(session_id = %handle.id, error = %e, "initial sync failed"),
            }
            if let Transition::Applied { .. } = this.commit(&handle, SessionStatus::Active).await {
                this.push_snapshot(&user, &handle.id).await;
            }
        });
    }

    async fn push_snapshot(&self, user: &UserId, session: &SessionId) {
        let init = init_snapshot(&self.deps, user, |id| self.status(id)).await;
        self.deps.fanout.send_to_user(user, init);
        let history = session_snapshot(&self.deps, user, session).await;
        self.deps.fanout.send_to_user(user, history);
    }

    async fn publish_status(
        &self,
        session: &SessionId,
        owner: Option<&UserId>,
        status: SessionStatus,
    ) {
        if let Err(e) = self.deps.store.update_session_status(session, status).await {
            warn!(session_id = %session, error = %e, "failed to persist session status");
        }
        self.emit(owner, RealtimeEvent::status(session.as_str(), status));
    }

    fn emit(&self, owner: Option<&UserId>, event: RealtimeEvent) {
        match owner {
            Some(user) => self.deps.fanout.send_to_user(user, event),
            None => self.deps.fanout.broadcast(event),
        }
    }

    /// Start every registered session, one at a time with a stagger in between.
    pub async fn start_existing_sessions(self: &Arc<Self>) -> usize {
        let records = match self.deps.store.list_sessions().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "failed to list sessions for startup");
                return 0;
            }
        };
        let stagger = Duration::from_secs(self.deps.config.sessions.startup_stagger_secs);
        info!(count = records.len(), "starting registered sessions");

        let mut started = 0;
        let mut first = true;
        for record in records {
            if self.sessions.contains_key(&record.session_id) {
                continue;
            }
            if !first {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(stagger) => {}
                }
            }
            if self.cancel.is_cancelled() {
                break;
            }
            first = false;
            if self.start_session(&record.session_id).await == StartOutcome::Started {
                started += 1;
            }
        }
        started
    }

    /// Stop all workers and close every transport.
    pub async fn close_all(&self) {
        self.cancel.cancel();
        let handles: Vec<Arc<SessionHandle>> =
            self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        info!(count = handles.len(), "closing sessions");
        futures::future::join_all(handles.iter().map(|h| async move {
            if let Err(e) = h.transport.close().await {
                warn!(session_id = %h.id, error = %e, "failed to close transport");
            }
        }))
        .await;
        self.sessions.clear();
        self.tasks.close();
    }

    /// Wait until every worker and sync task has finished. Only returns after [`Self::close_all`].
    pub async fn wait_idle(&self) {
        self.tasks.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadesk_core::PersistenceGateway;
    use wadesk_test_utils::{MockTransportFactory, TestHarness};

    use crate::orchestrator::AiOrchestrator;
    use crate::testing::deps;
    use crate::tools::ToolRegistry;

    struct Fixture {
        harness: TestHarness,
        manager: Arc<SessionManager>,
    }

    async fn fixture() -> Fixture {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.register("s1", "u1").await.unwrap();
        let deps = deps(&harness);
        let orchestrator = Arc::new(AiOrchestrator::new(
            deps.clone(),
            Arc::new(ToolRegistry::default()),
        ));
        let pipeline = Arc::new(MessagePipeline::new(deps.clone(), orchestrator));
        let sync = Arc::new(HistorySync::new(deps.clone()));
        let factory: Arc<dyn TransportFactory> = harness.transports.clone();
        let manager = Arc::new(SessionManager::new(
            deps,
            factory,
            pipeline,
            sync,
            CancellationToken::new(),
        ));
        Fixture { harness, manager }
    }

    fn factory(f: &Fixture) -> &Arc<MockTransportFactory> {
        &f.harness.transports
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached");
    }

    fn s1() -> SessionId {
        SessionId::from("s1")
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let handle = SessionHandle::new(
            s1(),
            None,
            Arc::new(wadesk_test_utils::MockTransport::default()),
            CancellationToken::new(),
        );
        assert!(matches!(
            handle.transition(SessionStatus::QrPending),
            Transition::Applied { .. }
        ));
        assert!(matches!(
            handle.transition(SessionStatus::Unpaired),
            Transition::Applied { .. }
        ));
        assert_eq!(
            handle.transition(SessionStatus::Connected),
            Transition::Rejected {
                from: SessionStatus::Unpaired,
                to: SessionStatus::Connected
            }
        );
        assert_eq!(handle.status(), SessionStatus::Unpaired);
    }

    #[tokio::test]
    async fn start_is_idempotent_while_active() {
        let f = fixture().await;
        assert_eq!(f.manager.start_session(&s1()).await, StartOutcome::Started);
        assert_eq!(
            f.manager.start_session(&s1()).await,
            StartOutcome::AlreadyActive
        );
        assert_eq!(factory(&f).create_count(), 1);
        assert_eq!(f.manager.status(&s1()), Some(SessionStatus::Initializing));
        assert_eq!(f.harness.fanout.count_of("sessionStatusUpdate"), 1);
    }

    #[tokio::test]
    async fn creation_failure_reports_error_create() {
        let f = fixture().await;
        factory(&f).set_fail_create(true);
        assert_eq!(f.manager.start_session(&s1()).await, StartOutcome::Failed);
        assert_eq!(f.manager.active_count(), 0);

        let record = f.harness.storage.list_sessions().await.unwrap().remove(0);
        assert_eq!(record.status, Some(SessionStatus::ErrorCreate));
    }

    #[tokio::test]
    async fn qr_then_connect_runs_sync_and_activates() {
        let f = fixture().await;
        let transport = factory(&f).prepare(&s1()).await;
        transport
            .set_chats(vec![wadesk_core::TransportChat {
                id: "111@c.us".into(),
                is_group: false,
                last_activity: 1,
            }])
            .await;
        f.manager.start_session(&s1()).await;

        factory(&f)
            .emit(
                &s1(),
                TransportEvent::Qr {
                    data: "data:image/png;base64,AAA".into(),
                    attempt: 1,
                },
            )
            .await;
        wait_for(|| f.manager.status(&s1()) == Some(SessionStatus::QrPending)).await;
        assert_eq!(f.harness.fanout.count_of("qrCode"), 1);

        factory(&f)
            .emit(&s1(), TransportEvent::StateChanged("isLogged".into()))
            .await;
        wait_for(|| f.manager.status(&s1()) == Some(SessionStatus::Active)).await;
        wait_for(|| f.harness.fanout.count_of("allChatsHistoryData") == 1).await;
        assert_eq!(f.harness.fanout.count_of("initialSyncComplete"), 1);
        assert_eq!(f.harness.fanout.count_of("init"), 1);
    }

    #[tokio::test]
    async fn terminal_state_tears_down_until_recreated() {
        let f = fixture().await;
        f.manager.start_session(&s1()).await;
        let transport = factory(&f).transport(&s1()).await.unwrap();

        factory(&f)
            .emit(&s1(), TransportEvent::StateChanged("UNPAIRED".into()))
            .await;
        wait_for(|| f.manager.status(&s1()).is_none()).await;
        assert!(transport.is_closed());

        let statuses: Vec<String> = f
            .harness
            .fanout
            .deliveries()
            .into_iter()
            .filter_map(|d| match d.event {
                RealtimeEvent::SessionStatusUpdate { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec!["INITIALIZING", "UNPAIRED", "CLOSED"]);

        assert_eq!(f.manager.start_session(&s1()).await, StartOutcome::Started);
        assert_eq!(factory(&f).create_count(), 2);
    }

    #[tokio::test]
    async fn stream_and_unknown_states_are_not_persisted() {
        let f = fixture().await;
        f.manager.start_session(&s1()).await;
        factory(&f)
            .emit(&s1(), TransportEvent::StreamChanged("CONNECTED".into()))
            .await;
        factory(&f)
            .emit(&s1(), TransportEvent::StateChanged("deviceNotConnected".into()))
            .await;
        wait_for(|| f.harness.fanout.count_of("sessionStatusUpdate") == 3).await;

        let record = f.harness.storage.list_sessions().await.unwrap().remove(0);
        assert_eq!(record.status, Some(SessionStatus::Initializing));
        assert_eq!(f.manager.status(&s1()), Some(SessionStatus::Initializing));
    }

    #[tokio::test]
    async fn startup_skips_running_sessions_and_close_all_stops_everything() {
        let f = fixture().await;
        f.harness.register("s2", "u1").await.unwrap();
        f.harness.register("s3", "u2").await.unwrap();
        f.manager.start_session(&s1()).await;

        assert_eq!(f.manager.start_existing_sessions().await, 2);
        assert_eq!(f.manager.active_ids().len(), 3);

        f.manager.close_all().await;
        tokio::time::timeout(Duration::from_secs(5), f.manager.wait_idle())
            .await
            .unwrap();
        assert_eq!(f.manager.active_count(), 0);
        for id in ["s1", "s2", "s3"] {
            let transport = factory(&f).transport(&SessionId::from(id)).await.unwrap();
            assert!(transport.is_closed());
        }
    }
}
