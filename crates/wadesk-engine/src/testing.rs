// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by the unit tests in this crate.

use std::sync::Arc;

use wadesk_test_utils::TestHarness;

use crate::ai_control::AiControl;
use crate::deps::EngineDeps;

pub(crate) fn deps(harness: &TestHarness) -> EngineDeps {
    EngineDeps {
        store: harness.storage.clone(),
        llm: harness.llm.clone(),
        transcriber: harness.transcriber.clone(),
        fanout: harness.fanout.clone(),
        ai: Arc::new(AiControl::default()),
        config: Arc::new(harness.config.clone()),
    }
}
