// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wadesk integration tests.
//!
//! Provides mock collaborators and a temp-store harness for fast,
//! deterministic tests without a WhatsApp sidecar, an LLM or whisper.
//!
//! # Components
//!
//! - [`MockTransport`] / [`MockTransportFactory`] - scripted chat transport with send capture
//! - [`MockLlm`] - queued chat completions, request capture
//! - [`MockTranscriber`] - fixed transcript
//! - [`RecordingFanOut`] - captures realtime events per user
//! - [`TestHarness`] - temp SQLite store plus all of the above

pub mod fanout;
pub mod harness;
pub mod mock_llm;
pub mod mock_transcriber;
pub mod mock_transport;

pub use fanout::{Delivery, RecordingFanOut};
pub use harness::{TestHarness, test_config};
pub use mock_llm::MockLlm;
pub use mock_transcriber::MockTranscriber;
pub use mock_transport::{FetchFailure, MockTransport, MockTransportFactory, SentKind, SentMessage};
