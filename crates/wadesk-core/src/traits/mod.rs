// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the engine is written against.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod fanout;
pub mod llm;
pub mod persistence;
pub mod transcriber;
pub mod transport;

pub use adapter::PluginAdapter;
pub use fanout::FanOut;
pub use llm::LlmProvider;
pub use persistence::PersistenceGateway;
pub use transcriber::Transcriber;
pub use transport::{TransportClient, TransportFactory};
