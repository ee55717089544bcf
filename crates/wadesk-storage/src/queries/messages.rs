// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence keyed by `(session, external_id)`.

use std::collections::BTreeMap;

use rusqlite::{Transaction, params};
use wadesk_core::types::{Label, MessageId, Role, SessionId, UserId};
use wadesk_core::{InsertOutcome, StoredMessage, WadeskError};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_column;

const SELECT_COLUMNS: &str = "SELECT user_id, session_name, chat_id, external_id, role, content, \
     timestamp_ms, is_voice, file_type, file_name, duration, is_voice_transcription, \
     failed_transcription, reactions FROM messages";

const INSERT_COLUMNS: &str = "INSERT INTO messages (user_id, session_name, chat_id, external_id, \
     role, content, timestamp_ms, is_voice, file_type, file_name, duration, \
     is_voice_transcription, failed_transcription, reactions) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let role: Role = parse_column(4, row.get::<_, String>(4)?)?;
    let reactions: Option<String> = row.get(13)?;
    Ok(StoredMessage {
        user_id: UserId(row.get(0)?),
        session_id: SessionId(row.get(1)?),
        chat_id: row.get(2)?,
        external_id: MessageId(row.get(3)?),
        role,
        content: row.get(5)?,
        timestamp_ms: row.get(6)?,
        is_voice: row.get(7)?,
        file_type: row.get(8)?,
        file_name: row.get(9)?,
        duration: row.get(10)?,
        is_voice_transcription: row.get(11)?,
        failed_transcription: row.get(12)?,
        reactions: reactions.and_then(|r| serde_json::from_str(&r).ok()),
    })
}

/// Execute `sql` (an INSERT with the 14 message columns) for one row.
fn execute_row(tx: &Transaction<'_>, sql: &str, m: &StoredMessage) -> rusqlite::Result<usize> {
    tx.execute(
        sql,
        params![
            m.user_id.0,
            m.session_id.0,
            m.chat_id,
            m.external_id.0,
            m.role.to_string(),
            m.content,
            m.timestamp_ms,
            m.is_voice,
            m.file_type,
            m.file_name,
            m.duration,
            m.is_voice_transcription,
            m.failed_transcription,
            m.reactions.as_ref().map(|r| r.to_string()),
        ],
    )
}

/// Ensure the chat's default label, then insert the message.
///
/// A key collision reports [`InsertOutcome::Duplicate`] and leaves the existing row intact.
pub async fn insert_message(
    db: &Database,
    msg: &StoredMessage,
    now_ms: i64,
) -> Result<InsertOutcome, WadeskError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO chat_labels (user_id, session_name, chat_id, label, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.user_id.0,
                    msg.session_id.0,
                    msg.chat_id,
                    Label::New.to_string(),
                    now_ms
                ],
            )?;
            let sql = format!("{INSERT_COLUMNS} ON CONFLICT(session_name, external_id) DO NOTHING");
            let inserted = execute_row(&tx, &sql, &msg)?;
            tx.commit()?;
            Ok(if inserted == 0 {
                InsertOutcome::Duplicate
            } else {
                InsertOutcome::Inserted
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a batch in one transaction. Existing keys only get `reactions` refreshed,
/// so transcripts and file names written later are never overwritten.
pub async fn upsert_messages(db: &Database, batch: &[StoredMessage]) -> Result<usize, WadeskError> {
    if batch.is_empty() {
        return Ok(0);
    }
    let batch = batch.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "{INSERT_COLUMNS} ON CONFLICT(session_name, external_id) \
                 DO UPDATE SET reactions = excluded.reactions"
            );
            for m in &batch {
                execute_row(&tx, &sql, m)?;
            }
            tx.commit()?;
            Ok(batch.len())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_file_name(
    db: &Database,
    session: &SessionId,
    external_id: &MessageId,
    file_name: &str,
) -> Result<(), WadeskError> {
    let (session, id, file_name) = (session.0.clone(), external_id.0.clone(), file_name.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET file_name = ?1 WHERE session_name = ?2 AND external_id = ?3",
                params![file_name, session, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_transcription(
    db: &Database,
    session: &SessionId,
    external_id: &MessageId,
    content: &str,
    is_voice_transcription: bool,
    failed: bool,
) -> Result<(), WadeskError> {
    let (session, id, content) = (session.0.clone(), external_id.0.clone(), content.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET content = ?1, is_voice_transcription = ?2, failed_transcription = ?3
                 WHERE session_name = ?4 AND external_id = ?5",
                params![content, is_voice_transcription, failed, session, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_message(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
    external_id: &MessageId,
) -> Result<(), WadeskError> {
    let (user, session, chat, id) = (
        user.0.clone(),
        session.0.clone(),
        chat_id.to_string(),
        external_id.0.clone(),
    );
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM messages
                 WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3 AND external_id = ?4",
                params![user, session, chat, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` messages of a chat, oldest first.
pub async fn recent_messages(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
    limit: usize,
) -> Result<Vec<StoredMessage>, WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3
                 ORDER BY timestamp_ms DESC, id DESC LIMIT ?4"
            ))?;
            let rows = stmt.query_map(params![user, session, chat, limit], row_to_message)?;
            let mut messages = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn chat_history(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
) -> Result<Vec<StoredMessage>, WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3
                 ORDER BY timestamp_ms ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![user, session, chat], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every message of a session grouped by chat.
pub async fn session_history(
    db: &Database,
    user: &UserId,
    session: &SessionId,
) -> Result<BTreeMap<String, Vec<StoredMessage>>, WadeskError> {
    let (user, session) = (user.0.clone(), session.0.clone());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 AND session_name = ?2
                 ORDER BY timestamp_ms ASC, id ASC"
            ))?;
            let mut grouped: BTreeMap<String, Vec<StoredMessage>> = BTreeMap::new();
            for row in stmt.query_map(params![user, session], row_to_message)? {
                let m = row?;
                grouped.entry(m.chat_id.clone()).or_default().push(m);
            }
            Ok(grouped)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_messages(db: &Database, session: &SessionId) -> Result<usize, WadeskError> {
    let session = session.0.clone();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_name = ?1",
                params![session],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
        .map_err(map_tr_err)
}
