// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wadesk session add` command implementation.

use wadesk_config::WadeskConfig;
use wadesk_core::{PersistenceGateway, PluginAdapter, SessionId, UserId, WadeskError};
use wadesk_storage::SqliteStorage;

/// Session names become bridge path segments, so keep them to a safe alphabet.
fn validate_session_name(name: &str) -> Result<(), WadeskError> {
    if name.is_empty() {
        return Err(WadeskError::Validation("session name is empty".into()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(WadeskError::Validation(format!(
            "session name '{name}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

/// Register `session` for `user`. A running server picks it up on its next start.
pub async fn run_session_add(
    config: &WadeskConfig,
    session: &str,
    user: &str,
) -> Result<(), WadeskError> {
    validate_session_name(session)?;
    if user.trim().is_empty() {
        return Err(WadeskError::Validation("user id is empty".into()));
    }

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage
        .register_session(&SessionId::from(session), &UserId::from(user.trim()))
        .await?;
    storage.shutdown().await?;

    println!("registered session {session} for user {}", user.trim());
    Ok(())
}
