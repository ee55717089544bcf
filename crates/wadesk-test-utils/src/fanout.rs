// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out that records every delivery.

use std::sync::Mutex;

use wadesk_core::{FanOut, RealtimeEvent, UserId};

/// One recorded delivery; `user` is `None` for broadcasts.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub user: Option<UserId>,
    pub event: RealtimeEvent,
}

impl Delivery {
    /// The wire `type` tag of the event.
    pub fn event_type(&self) -> String {
        event_type(&self.event)
    }
}

fn event_type(event: &RealtimeEvent) -> String {
    serde_json::to_value(event)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_default()
}

#[derive(Default)]
pub struct RecordingFanOut {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingFanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Events addressed to `user` (broadcasts excluded).
    pub fn events_for(&self, user: &UserId) -> Vec<RealtimeEvent> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.user.as_ref() == Some(user))
            .map(|d| d.event)
            .collect()
    }

    /// Wire types of all deliveries, in order.
    pub fn event_types(&self) -> Vec<String> {
        self.deliveries().iter().map(Delivery::event_type).collect()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.event_types().iter().filter(|t| *t == event_type).count()
    }

    pub fn clear(&self) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.clear();
        }
    }

    fn push(&self, user: Option<UserId>, event: RealtimeEvent) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.push(Delivery { user, event });
        }
    }
}

impl FanOut for RecordingFanOut {
    fn send_to_user(&self, user: &UserId, event: RealtimeEvent) {
        self.push(Some(user.clone()), event);
    }

    fn broadcast(&self, event: RealtimeEvent) {
        self.push(None, event);
    }
}
