// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that every long-running task monitors. Sessions
//! are then closed and in-flight voice jobs drained within a grace period.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::SessionManager;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Close every session, then wait for background voice jobs.
pub async fn drain_sessions(sessions: &SessionManager) {
    let active = sessions.active_count();
    info!(count = active, "closing sessions");
    sessions.close_all().await;
    sessions.wait_idle().await;

    let pipeline = sessions.pipeline();
    let in_flight = pipeline.voice_jobs_in_flight();
    if in_flight > 0 {
        info!(count = in_flight, "waiting for voice jobs");
    }
    pipeline.wait_voice_jobs().await;
    info!("all sessions drained");
}

/// Run `shutdown` with a deadline. Returns `false` when the deadline passed first,
/// in which case the caller should exit without waiting any further.
pub async fn run_with_grace<F>(shutdown: F, grace: Duration) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(grace, shutdown).await {
        Ok(()) => true,
        Err(_) => {
            error!(grace_secs = grace.as_secs(), "graceful shutdown timed out, forcing exit");
            false
        }
    }
}
