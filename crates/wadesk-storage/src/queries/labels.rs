// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat labels, one per `(user, session, chat)`.

use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, params};
use tracing::warn;
use wadesk_core::WadeskError;
use wadesk_core::events::LabelMap;
use wadesk_core::types::{Label, SessionId, UserId};

use crate::database::{Database, map_tr_err};

/// The stored label, or [`Label::New`] when none exists or the stored value is unknown.
pub async fn get_label(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
) -> Result<Label, WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    let raw = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT label FROM chat_labels WHERE user_id = ?1 AND session_name = ?2 AND chat_id = ?3",
                params![user, session, chat],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    Ok(raw.and_then(|l| l.parse().ok()).unwrap_or_default())
}

pub async fn set_label(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_id: &str,
    label: Label,
    now_ms: i64,
) -> Result<(), WadeskError> {
    let (user, session, chat) = (user.0.clone(), session.0.clone(), chat_id.to_string());
    let label = label.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_labels (user_id, session_name, chat_id, label, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id, session_name, chat_id)
                 DO UPDATE SET label = excluded.label, updated_at = excluded.updated_at",
                params![user, session, chat, label, now_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert-or-ignore the default label for every chat. Returns `chat_ids.len()`.
pub async fn ensure_default_labels(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    chat_ids: &[String],
    now_ms: i64,
) -> Result<usize, WadeskError> {
    if chat_ids.is_empty() {
        return Ok(0);
    }
    let (user, session) = (user.0.clone(), session.0.clone());
    let chat_ids = chat_ids.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO chat_labels (user_id, session_name, chat_id, label, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                let default = Label::New.to_string();
                for chat in &chat_ids {
                    stmt.execute(params![user, session, chat, default, now_ms])?;
                }
            }
            tx.commit()?;
            Ok(chat_ids.len())
        })
        .await
        .map_err(map_tr_err)
}

/// Session → chat → label for all of `user`'s chats.
pub async fn user_labels(
    db: &Database,
    user: &UserId,
) -> Result<BTreeMap<String, LabelMap>, WadeskError> {
    let user = user.0.clone();
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_name, chat_id, label FROM chat_labels WHERE user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)?;

    let mut map: BTreeMap<String, LabelMap> = BTreeMap::new();
    for (session, chat, raw) in rows {
        let label = raw.parse().unwrap_or_else(|_| {
            warn!(session_id = %session, chat_id = %chat, label = %raw, "unknown stored label");
            Label::New
        });
        map.entry(session).or_default().insert(chat, label);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::test_db;

    #[tokio::test]
    async fn unset_label_reads_as_new() {
        let (db, _dir) = test_db().await;
        let label = get_label(&db, &UserId::from("u"), &SessionId::from("s"), "c@c.us")
            .await
            .unwrap();
        assert_eq!(label, Label::New);
    }

    #[tokio::test]
    async fn ensure_default_does_not_overwrite() {
        let (db, _dir) = test_db().await;
        let (u, s) = (UserId::from("u"), SessionId::from("s"));
        set_label(&db, &u, &s, "a@c.us", Label::Paid, 1).await.unwrap();

        let n = ensure_default_labels(&db, &u, &s, &["a@c.us".into(), "b@c.us".into()], 2)
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(get_label(&db, &u, &s, "a@c.us").await.unwrap(), Label::Paid);
        assert_eq!(get_label(&db, &u, &s, "b@c.us").await.unwrap(), Label::New);

        let all = user_labels(&db, &u).await.unwrap();
        assert_eq!(all["s"].len(), 2);
        assert_eq!(all["s"]["a@c.us"], Label::Paid);
    }

    #[tokio::test]
    async fn set_label_overwrites() {
        let (db, _dir) = test_db().await;
        let (u, s) = (UserId::from("u"), SessionId::from("s"));
        set_label(&db, &u, &s, "a@c.us", Label::InProgress, 1).await.unwrap();
        set_label(&db, &u, &s, "a@c.us", Label::Waiting, 2).await.unwrap();
        assert_eq!(get_label(&db, &u, &s, "a@c.us").await.unwrap(), Label::Waiting);
    }
}
