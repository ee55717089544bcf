// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic removal of stale voice-job directories and stored uploads.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wadesk_config::model::WadeskConfig;

const RECORDINGS_EVERY: Duration = Duration::from_secs(6 * 3600);
const UPLOADS_EVERY: Duration = Duration::from_secs(12 * 3600);

/// One directory swept on a fixed interval.
#[derive(Debug, Clone)]
pub struct SweepTarget {
    pub dir: PathBuf,
    pub every: Duration,
    pub max_age: Duration,
}

impl SweepTarget {
    pub fn from_config(config: &WadeskConfig) -> Vec<Self> {
        vec![
            Self {
                dir: PathBuf::from(&config.transcription.recordings_dir),
                every: RECORDINGS_EVERY,
                max_age: Duration::from_secs(config.transcription.retention_hours * 3600),
            },
            Self {
                dir: PathBuf::from(&config.media.uploads_dir),
                every: UPLOADS_EVERY,
                max_age: Duration::from_secs(config.media.retention_hours * 3600),
            },
        ]
    }
}

/// Delete entries of `dir` last modified more than `max_age` ago.
///
/// Directories are removed recursively. A missing `dir` counts as empty.
/// Returns how many entries were removed.
pub async fn sweep_dir(dir: &Path, max_age: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read directory for cleanup");
            return 0;
        }
    };
    let now = SystemTime::now();
    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "directory listing interrupted");
                break;
            }
        };
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        let path = entry.path();
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale entry"),
        }
    }
    removed
}

/// Spawn one sweeper per target; each stops when `cancel` fires.
pub fn spawn_sweepers(targets: Vec<SweepTarget>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
    targets
        .into_iter()
        .map(|target| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(target.every);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let removed = sweep_dir(&target.dir, target.max_age).await;
                            if removed > 0 {
                                info!(dir = %target.dir.display(), removed, "removed stale files");
                            }
                        }
                    }
                }
                debug!(dir = %target.dir.display(), "sweeper stopped");
            })
        })
        .collect()
}
