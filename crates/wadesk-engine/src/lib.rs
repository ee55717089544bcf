// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration and message processing for wadesk.
//!
//! The [`Engine`] wires together:
//! - the [`SessionManager`], which owns each session's connection and worker loop
//! - the [`MessagePipeline`], which gates and stores inbound messages
//! - the [`AiOrchestrator`], which answers customers with tool calling
//! - the [`HistorySync`], which backfills chat history
//! - [`ChatOps`], the operations UI clients request

pub mod ai_control;
pub mod context;
pub mod deps;
pub mod housekeeping;
pub mod media;
pub mod ops;
pub mod orchestrator;
pub mod pipeline;
pub(crate) mod publish;
pub mod session;
pub mod shutdown;
pub mod snapshot;
pub mod sync;
pub mod tools;
pub mod voice;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use wadesk_core::TransportFactory;

pub use ai_control::AiControl;
pub use deps::{ChatTarget, EngineDeps};
pub use ops::ChatOps;
pub use orchestrator::{AiOrchestrator, TurnReport};
pub use pipeline::{DropReason, MessagePipeline, PipelineOutcome};
pub use session::{SessionManager, StartOutcome};
pub use sync::{HistorySync, SyncReport};
pub use tools::{Tool, ToolRegistry};

/// The assembled engine: one session manager plus the operations facade.
pub struct Engine {
    pub deps: EngineDeps,
    pub sessions: Arc<SessionManager>,
    pub ops: Arc<ChatOps>,
}

impl Engine {
    /// Build the engine with the built-in tools.
    pub fn new(
        deps: EngineDeps,
        factory: Arc<dyn TransportFactory>,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_tools(deps, factory, ToolRegistry::with_builtin(), cancel)
    }

    pub fn with_tools(
        deps: EngineDeps,
        factory: Arc<dyn TransportFactory>,
        tools: ToolRegistry,
        cancel: CancellationToken,
    ) -> Self {
        let orchestrator = Arc::new(AiOrchestrator::new(deps.clone(), Arc::new(tools)));
        let pipeline = Arc::new(MessagePipeline::new(deps.clone(), orchestrator));
        let sync = Arc::new(HistorySync::new(deps.clone()));
        let sessions = Arc::new(SessionManager::new(
            deps.clone(),
            factory,
            pipeline,
            sync,
            cancel,
        ));
        let ops = Arc::new(ChatOps::new(deps.clone(), Arc::clone(&sessions)));
        info!(
            ai_enabled = deps.ai.is_enabled(),
            timezone = deps.config.ai.timezone.as_str(),
            "engine initialized"
        );
        Self {
            deps,
            sessions,
            ops,
        }
    }

    /// Reconnect every stored session, staggered.
    pub async fn start(&self) -> usize {
        self.sessions.start_existing_sessions().await
    }

    /// Close sessions and drain background work.
    pub async fn shutdown(&self) {
        shutdown::drain_sessions(&self.sessions).await;
    }
}
