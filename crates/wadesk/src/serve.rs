// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wadesk serve` command implementation.
//!
//! Opens SQLite storage, builds the OpenAI provider, the whisper transcriber
//! and the bridge transport factory, then runs the engine behind the UI
//! gateway until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use wadesk_bridge::BridgeTransportFactory;
use wadesk_config::WadeskConfig;
use wadesk_core::{PersistenceGateway, PluginAdapter, WadeskError};
use wadesk_engine::housekeeping::{SweepTarget, spawn_sweepers};
use wadesk_engine::shutdown::{install_signal_handler, run_with_grace};
use wadesk_engine::{AiControl, Engine, EngineDeps};
use wadesk_gateway::{ConnectionHub, Gateway, GatewayState, StaticTokenVerifier};
use wadesk_openai::OpenAiProvider;
use wadesk_storage::SqliteStorage;
use wadesk_transcribe::WhisperTranscriber;

/// Runs the `wadesk serve` command.
///
/// Shutdown order: the gateway stops accepting clients, sessions close and
/// drain their voice jobs, then storage checkpoints. If that takes longer
/// than `sessions.shutdown_grace_secs` the process exits anyway.
pub async fn run_serve(config: WadeskConfig) -> Result<(), WadeskError> {
    info!("starting wadesk serve");
    let cancel = install_signal_handler();

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let llm = Arc::new(OpenAiProvider::new(&config.openai)?);
    let transcriber = Arc::new(WhisperTranscriber::new(&config.transcription));
    let factory = Arc::new(BridgeTransportFactory::new(&config.bridge)?);
    let hub = Arc::new(ConnectionHub::new());

    let verifier = StaticTokenVerifier::from_config(&config.auth);
    if verifier.is_empty() {
        warn!("no auth tokens configured, every UI client will be rejected");
    }

    let config = Arc::new(config);
    let deps = EngineDeps {
        store: storage.clone(),
        llm,
        transcriber,
        fanout: hub.clone(),
        ai: Arc::new(AiControl::from_config(&config.ai)),
        config: Arc::clone(&config),
    };
    let engine = Engine::new(deps, factory, cancel.clone());

    let state = GatewayState::new(
        Arc::clone(&engine.ops),
        Arc::clone(&hub),
        Arc::new(verifier),
        cancel.clone(),
    );
    let gateway = Gateway::new(config.server.clone(), state);
    gateway.start().await?;

    let sweepers = spawn_sweepers(SweepTarget::from_config(&config), cancel.clone());

    let sessions = Arc::clone(&engine.sessions);
    let startup = tokio::spawn(async move {
        let started = sessions.start_existing_sessions().await;
        info!(count = started, "session startup finished");
    });

    cancel.cancelled().await;
    info!("shutdown requested");
    startup.abort();

    let grace = Duration::from_secs(config.sessions.shutdown_grace_secs);
    let clean = run_with_grace(
        async {
            gateway.shutdown().await;
            engine.shutdown().await;
            if let Err(e) = storage.shutdown().await {
                warn!(error = %e, "storage shutdown failed");
            }
            for sweeper in sweepers {
                let _ = sweeper.await;
            }
        },
        grace,
    )
    .await;

    if !clean {
        std::process::exit(1);
    }
    info!("wadesk serve shutdown complete");
    Ok(())
}
