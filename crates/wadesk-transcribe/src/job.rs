// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job working directories under the recordings root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};
use wadesk_core::WadeskError;

/// A directory holding one voice note, whisper's output and its process log.
#[derive(Debug, Clone)]
pub struct JobDir {
    path: PathBuf,
}

impl JobDir {
    /// Create `<root>/<job_id>`, including missing parents.
    pub async fn create(root: impl AsRef<Path>, job_id: &str) -> Result<Self, WadeskError> {
        let path = root.as_ref().join(sanitize(job_id));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| WadeskError::Internal(format!("cannot create job dir {}: {e}", path.display())))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a file inside the job directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory after `delay` on a detached task. Failures are logged.
    pub fn schedule_removal(self, delay: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match tokio::fs::remove_dir_all(&self.path).await {
                Ok(()) => debug!(path = %self.path.display(), "job directory removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove job directory"),
            }
        })
    }
}

/// Keep ids filesystem-safe: anything outside `[A-Za-z0-9_-]` becomes `_`.
fn sanitize(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "job".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_transport_ids() {
        assert_eq!(sanitize("false_972501234567@c.us_3EB0"), "false_972501234567_c_us_3EB0");
        assert_eq!(sanitize("../x"), "___x");
        assert_eq!(sanitize(""), "job");
    }

    #[tokio::test]
    async fn create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let job = JobDir::create(root.path().join("recordings"), "abc").await.unwrap();
        assert!(job.path().is_dir());
        tokio::fs::write(job.file("audio_abc.ogg"), b"x").await.unwrap();

        let path = job.path().to_path_buf();
        job.schedule_removal(Duration::from_millis(10)).await.unwrap();
        assert!(!path.exists());
    }
}
