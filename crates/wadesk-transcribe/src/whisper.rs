// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whisper CLI subprocess transcriber.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use wadesk_config::model::TranscriptionConfig;
use wadesk_core::{AdapterType, HealthStatus, PluginAdapter, Transcriber, WadeskError};

use crate::transcript::extract_transcript;

/// Runs `<command> <file> --language <lang> --model <model> --output_format txt
/// --output_dir . --verbose False` inside the job directory.
///
/// The child is killed once `timeout` elapses; a timeout counts as an empty
/// transcript. Stdout and stderr go to `whisper_process_<id>.log`.
pub struct WhisperTranscriber {
    command: String,
    model: String,
    language: String,
    timeout: Duration,
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn args(&self, file_name: &str) -> Vec<String> {
        [
            file_name,
            "--language",
            self.language.as_str(),
            "--model",
            self.model.as_str(),
            "--output_format",
            "txt",
            "--output_dir",
            ".",
            "--verbose",
            "False",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    async fn run(&self, audio: &Path, work_dir: &Path, id: &str) -> Result<String, WadeskError> {
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WadeskError::Validation(format!("bad audio path {}", audio.display())))?;
        let stem = audio
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        let args = self.args(file_name);

        let mut log = ProcessLog::open(&work_dir.join(format!("whisper_process_{id}.log"))).await;
        log.write(&format!(
            "--- Whisper Start ({}) ---\nCmd: {} {}\nCWD: {}\nAudio: {}\n\n",
            chrono::Utc::now().to_rfc3339(),
            self.command,
            args.join(" "),
            work_dir.display(),
            audio.display()
        ))
        .await;

        info!(id, model = %self.model, language = %self.language, "running whisper");
        let child = tokio::process::Command::new(&self.command)
            .args(&args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WadeskError::Internal(format!("failed to spawn {}: {e}", self.command))
            });
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                log.write(&format!("\n--- SPAWN ERR ---\n{e}\n")).await;
                return Err(e);
            }
        };

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log.write(&format!("\n--- PROC ERR ---\n{e}\n")).await;
                return Err(WadeskError::Internal(format!("whisper wait failed: {e}")));
            }
            Err(_) => {
                log.write("\n--- TIMEOUT: process killed ---\n").await;
                return Err(WadeskError::Timeout {
                    duration: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            log.write(&format!("[STDOUT] {line}\n")).await;
        }
        for line in stderr.lines() {
            log.write(&format!("[STDERR] {line}\n")).await;
        }
        let code = output.status.code();
        log.write(&format!(
            "\n--- Whisper End ({}) Code: {code:?} ---\n",
            chrono::Utc::now().to_rfc3339()
        ))
        .await;
        debug!(id, ?code, "whisper exited");
        if !output.status.success() && !stderr.trim().is_empty() {
            warn!(id, stderr = %stderr.trim(), "whisper reported errors");
        }

        // The transcript file is read even after a non-zero exit.
        let transcript_path = work_dir.join(format!("{stem}.txt"));
        let content = tokio::fs::read_to_string(&transcript_path)
            .await
            .map_err(|e| {
                WadeskError::Internal(format!(
                    "transcript {} unreadable (exit {code:?}): {e}",
                    transcript_path.display()
                ))
            })?;
        Ok(extract_transcript(&content))
    }
}

/// Append-only process log. Write failures are ignored after a warning.
struct ProcessLog {
    file: Option<tokio::fs::File>,
}

impl ProcessLog {
    async fn open(path: &Path) -> Self {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await;
        match file {
            Ok(file) => Self { file: Some(file) },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open whisper process log");
                Self { file: None }
            }
        }
    }

    async fn write(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut()
            && file.write_all(text.as_bytes()).await.is_err()
        {
            self.file = None;
        }
    }
}

#[async_trait]
impl PluginAdapter for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcriber
    }

    async fn health_check(&self) -> Result<HealthStatus, WadeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WadeskError> {
        Ok(())
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path, work_dir: &Path, correlation_id: &str) -> String {
        match self.run(audio, work_dir, correlation_id).await {
            Ok(text) => {
                info!(id = correlation_id, chars = text.chars().count(), "transcription finished");
                text
            }
            Err(e) => {
                warn!(id = correlation_id, error = %e, "transcription failed");
                String::new()
            }
        }
    }
}
