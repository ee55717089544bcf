// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user AI settings rows.

use rusqlite::{OptionalExtension, params};
use wadesk_core::WadeskError;
use wadesk_core::settings::{AiSettingsUpdate, StoredAiSettings};
use wadesk_core::types::UserId;

use crate::database::{Database, map_tr_err};

pub async fn get_settings(
    db: &Database,
    user: &UserId,
) -> Result<Option<StoredAiSettings>, WadeskError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT ai_instructions, ai_model, ai_temperature, ai_max_tokens, ai_delay_seconds
                 FROM user_settings WHERE user_id = ?1",
                params![user],
                |row| {
                    Ok(StoredAiSettings {
                        instructions: row.get(0)?,
                        model: row.get(1)?,
                        temperature: row.get(2)?,
                        max_tokens: row.get(3)?,
                        delay_seconds: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert only the columns present in `update`.
pub async fn update_settings(
    db: &Database,
    user: &UserId,
    update: &AiSettingsUpdate,
    now_ms: i64,
) -> Result<(), WadeskError> {
    if update.is_empty() {
        return Ok(());
    }
    let user = user.0.clone();
    let update = update.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO user_settings (user_id, updated_at) VALUES (?1, ?2)",
                params![user, now_ms],
            )?;
            if let Some(instructions) = &update.instructions {
                tx.execute(
                    "UPDATE user_settings SET ai_instructions = ?1 WHERE user_id = ?2",
                    params![instructions, user],
                )?;
            }
            if let Some(model) = &update.model {
                tx.execute(
                    "UPDATE user_settings SET ai_model = ?1 WHERE user_id = ?2",
                    params![model, user],
                )?;
            }
            if let Some(t) = update.temperature {
                tx.execute(
                    "UPDATE user_settings SET ai_temperature = ?1 WHERE user_id = ?2",
                    params![t, user],
                )?;
            }
            if let Some(v) = update.max_tokens {
                tx.execute(
                    "UPDATE user_settings SET ai_max_tokens = ?1 WHERE user_id = ?2",
                    params![v, user],
                )?;
            }
            if let Some(v) = update.delay_seconds {
                tx.execute(
                    "UPDATE user_settings SET ai_delay_seconds = ?1 WHERE user_id = ?2",
                    params![v, user],
                )?;
            }
            tx.execute(
                "UPDATE user_settings SET updated_at = ?1 WHERE user_id = ?2",
                params![now_ms, user],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
