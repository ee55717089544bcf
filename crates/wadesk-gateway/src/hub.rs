// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of open WebSocket connections, grouped by user.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wadesk_core::{FanOut, RealtimeEvent, UserId};

/// Size of the per-connection send buffer.
pub const CONNECTION_BUFFER_SIZE: usize = 256;

/// Serialized JSON frame shared by every recipient.
pub type Frame = Arc<str>;

pub type ConnectionId = u64;

struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
}

/// Per-user connection registry. Delivery is best-effort and never blocks:
/// a connection whose buffer is full misses the frame, a closed one is pruned.
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<UserId, Vec<Connection>>,
    next_id: AtomicU64,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user`. Frames for it arrive on the receiver;
    /// the returned sender feeds the same connection directly.
    pub fn register(
        &self,
        user: &UserId,
    ) -> (ConnectionId, mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .entry(user.clone())
            .or_default()
            .push(Connection { id, tx: tx.clone() });
        info!(user_id = %user, connection = id, "client connected");
        (id, tx, rx)
    }

    pub fn unregister(&self, user: &UserId, id: ConnectionId) {
        if let Some(mut conns) = self.connections.get_mut(user) {
            conns.retain(|c| c.id != id);
        }
        self.connections.remove_if(user, |_, conns| conns.is_empty());
        info!(user_id = %user, connection = id, "client disconnected");
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|e| e.value().len()).sum()
    }

    pub fn user_count(&self) -> usize {
        self.connections.len()
    }

    /// Forget every connection; no further fan-out reaches them.
    pub fn close_all(&self) {
        self.connections.clear();
    }

    fn deliver(conns: &mut Vec<Connection>, frame: &Frame) {
        conns.retain(|c| match c.tx.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = c.id, "client is not keeping up, frame dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

impl FanOut for ConnectionHub {
    fn send_to_user(&self, user: &UserId, event: RealtimeEvent) {
        let Some(mut conns) = self.connections.get_mut(user) else {
            debug!(user_id = %user, "no open connections, event dropped");
            return;
        };
        let frame: Frame = event.to_json().into();
        Self::deliver(&mut conns, &frame);
    }

    fn broadcast(&self, event: RealtimeEvent) {
        let frame: Frame = event.to_json().into();
        for mut conns in self.connections.iter_mut() {
            Self::deliver(&mut conns, &frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(id: &str) -> UserId {
        UserId::from(id)
    }

    #[tokio::test]
    async fn delivers_only_to_the_target_user() {
        let hub = ConnectionHub::new();
        let (_, _, mut a1) = hub.register(&u("a"));
        let (_, _, mut a2) = hub.register(&u("a"));
        let (_, _, mut b) = hub.register(&u("b"));

        hub.send_to_user(&u("a"), RealtimeEvent::error("hello"));
        assert!(a1.recv().await.unwrap().contains("hello"));
        assert!(a2.recv().await.unwrap().contains("hello"));
        assert!(b.try_recv().is_err());

        hub.broadcast(RealtimeEvent::AiStateConfirmed { enabled: true });
        assert!(b.recv().await.unwrap().contains("aiStateConfirmed"));
    }

    #[tokio::test]
    async fn closed_connections_are_pruned() {
        let hub = ConnectionHub::new();
        let (_, _, rx) = hub.register(&u("a"));
        let (_, _, _keep) = hub.register(&u("a"));
        drop(rx);
        hub.send_to_user(&u("a"), RealtimeEvent::error("x"));
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn unregister_removes_empty_users() {
        let hub = ConnectionHub::new();
        let (first, _, _rx1) = hub.register(&u("a"));
        let (second, _, _rx2) = hub.register(&u("a"));
        hub.unregister(&u("a"), first);
        assert_eq!(hub.connection_count(), 1);
        hub.unregister(&u("a"), second);
        assert_eq!(hub.user_count(), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn full_buffers_do_not_block() {
        let hub = ConnectionHub::new();
        let (_, _, mut rx) = hub.register(&u("a"));
        for _ in 0..CONNECTION_BUFFER_SIZE + 10 {
            hub.send_to_user(&u("a"), RealtimeEvent::error("x"));
        }
        assert_eq!(hub.connection_count(), 1);
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CONNECTION_BUFFER_SIZE);
        assert!(logs_contain("frame dropped"));
    }
}
