// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime fan-out to connected UI clients.

use crate::events::RealtimeEvent;
use crate::types::UserId;

/// Best-effort delivery of events to UI connections.
///
/// Both methods must not block; slow or closed connections drop events.
pub trait FanOut: Send + Sync {
    fn send_to_user(&self, user: &UserId, event: RealtimeEvent);

    fn broadcast(&self, event: RealtimeEvent);
}
