// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice-note transcription for wadesk.
//!
//! [`WhisperTranscriber`] runs the `whisper` CLI as a subprocess in a
//! per-job directory and extracts the plain transcript from its `.txt`
//! output. [`JobDir`] owns those directories and their delayed removal.

pub mod job;
pub mod transcript;
pub mod whisper;

pub use job::JobDir;
pub use transcript::extract_transcript;
pub use whisper::WhisperTranscriber;
