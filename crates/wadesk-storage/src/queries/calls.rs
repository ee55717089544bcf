// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled callback requests.

use rusqlite::{OptionalExtension, params};
use wadesk_core::WadeskError;
use wadesk_core::records::{CallStatus, NewScheduledCall, ScheduledCall};
use wadesk_core::types::{SessionId, UserId};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_column;

const SELECT_COLUMNS: &str = "SELECT id, user_id, session_name, chat_id, callback_phone, \
     customer_name, requested_time_text, status, created_at, updated_at FROM scheduled_calls";

fn row_to_call(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledCall> {
    let status: CallStatus = parse_column(7, row.get::<_, String>(7)?)?;
    Ok(ScheduledCall {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        session_id: SessionId(row.get(2)?),
        chat_id: row.get(3)?,
        callback_phone: row.get(4)?,
        customer_name: row.get(5)?,
        requested_time_text: row.get(6)?,
        status,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert a pending call and return the stored row.
pub async fn insert_call(
    db: &Database,
    call: &NewScheduledCall,
    now_ms: i64,
) -> Result<ScheduledCall, WadeskError> {
    let call = call.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduled_calls (user_id, session_name, chat_id, callback_phone,
                     customer_name, requested_time_text, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    call.user_id.0,
                    call.session_id.0,
                    call.chat_id,
                    call.callback_phone,
                    call.customer_name,
                    call.requested_time_text,
                    CallStatus::Pending.to_string(),
                    now_ms,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], row_to_call)
        })
        .await
        .map_err(map_tr_err)
}

/// Move the chat's pending calls to a new time. `None` when nothing was pending.
pub async fn update_pending_call(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
    requested_time_text: &str,
    now_ms: i64,
) -> Result<Option<ScheduledCall>, WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    let time = requested_time_text.to_string();
    db.connection()
        .call(move |conn| {
            let pending = CallStatus::Pending.to_string();
            let changed = conn.execute(
                "UPDATE scheduled_calls SET requested_time_text = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND session_name = ?4 AND chat_id = ?5 AND status = ?6",
                params![time, now_ms, user, session, chat, pending],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!(
                    "{SELECT_COLUMNS} WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3
                     AND status = ?4 ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                params![user, session, chat, pending],
                row_to_call,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn latest_call(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
) -> Result<Option<ScheduledCall>, WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "{SELECT_COLUMNS} WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                params![user, session, chat],
                row_to_call,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
