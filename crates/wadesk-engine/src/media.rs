// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File naming for stored media and voice notes.

use std::path::{Path, PathBuf};

use wadesk_core::{TransportMessage, WadeskError};

/// Keep names filesystem-safe: anything outside `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension (without the dot) for an upload: the original file's, else one derived
/// from the mimetype, else `bin`.
pub fn upload_extension(filename: Option<&str>, mimetype: Option<&str>) -> String {
    if let Some(ext) = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        return sanitize(&ext.to_ascii_lowercase());
    }
    let Some(mime) = mimetype.map(|m| m.split(';').next().unwrap_or(m).trim()) else {
        return "bin".to_string();
    };
    match mime {
        "image/jpeg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/gif" => "gif".to_string(),
        "video/mp4" => "mp4".to_string(),
        "application/pdf" => "pdf".to_string(),
        other => other
            .split_once('/')
            .map(|(_, sub)| sub.split('+').next().unwrap_or(sub))
            .filter(|sub| !sub.is_empty())
            .map(sanitize)
            .unwrap_or_else(|| "bin".to_string()),
    }
}

/// Extension (with the dot) for a voice note, by mimetype. Unknown types are ogg.
pub fn audio_extension(mimetype: Option<&str>) -> &'static str {
    let mime = mimetype.unwrap_or_default().to_ascii_lowercase();
    if mime.contains("ogg") {
        ".ogg"
    } else if mime.contains("audio/mp4") {
        ".m4a"
    } else if mime.contains("audio/mpeg") {
        ".mp3"
    } else if mime.contains("audio/webm") {
        ".webm"
    } else {
        ".ogg"
    }
}

/// Unique name for an upload: owner, session and chat, then the file's own stem.
pub fn upload_file_name(
    user: &str,
    session: &str,
    chat_id: &str,
    message: &TransportMessage,
    now_ms: i64,
    nonce: &str,
) -> String {
    let kind = message.kind.as_deref().unwrap_or("file");
    let stem = message
        .filename
        .as_deref()
        .and_then(|f| Path::new(f).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(kind);
    let ext = upload_extension(message.filename.as_deref(), message.mimetype.as_deref());
    format!(
        "{}_{}_{}_{}_{now_ms}-{}.{ext}",
        sanitize(user),
        sanitize(session),
        sanitize(chat_id),
        sanitize(stem),
        sanitize(nonce),
    )
}

/// Write `bytes` into `dir` under `name`, creating the directory if needed.
pub async fn write_upload(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, WadeskError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| WadeskError::Internal(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| WadeskError::Internal(format!("cannot write {}: {e}", path.display())))?;
    Ok(path)
}

/// Six random characters for file names.
pub fn nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..6].to_string()
}
