// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry operations.

use rusqlite::{OptionalExtension, params};
use wadesk_core::WadeskError;
use wadesk_core::records::SessionRecord;
use wadesk_core::types::{SessionId, SessionStatus, UserId};

use crate::database::{Database, map_tr_err};

const SELECT_COLUMNS: &str = "SELECT session_name, user_id, status, last_activity_at FROM user_sessions";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let status: Option<String> = row.get(2)?;
    Ok(SessionRecord {
        session_id: SessionId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        status: status.as_deref().and_then(SessionStatus::from_transport),
        last_activity_at: row.get(3)?,
    })
}

/// Register a session for `user`, or move it to `user` if it already exists.
pub async fn register_session(
    db: &Database,
    session: &SessionId,
    user: &UserId,
    now_ms: i64,
) -> Result<(), WadeskError> {
    let session = session.0.clone();
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_sessions (session_name, user_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_name) DO UPDATE SET user_id = excluded.user_id",
                params![session, user, now_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn session_owner(db: &Database, session: &SessionId) -> Result<Option<UserId>, WadeskError> {
    let session = session.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id FROM user_sessions WHERE session_name = ?1",
                params![session],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
        .map(|owner| owner.map(UserId))
        .map_err(map_tr_err)
}

pub async fn is_user_authorized(
    db: &Database,
    user: &UserId,
    session: &SessionId,
) -> Result<bool, WadeskError> {
    let user = user.0.clone();
    let session = session.0.clone();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM user_sessions WHERE session_name = ?1 AND user_id = ?2",
                params![session, user],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All registered sessions, oldest registration first.
pub async fn list_sessions(db: &Database) -> Result<Vec<SessionRecord>, WadeskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC"))?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_user_sessions(
    db: &Database,
    user: &UserId,
) -> Result<Vec<SessionRecord>, WadeskError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![user], row_to_record)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Record the latest status. Unregistered sessions are ignored.
pub async fn update_session_status(
    db: &Database,
    session: &SessionId,
    status: SessionStatus,
    now_ms: i64,
) -> Result<(), WadeskError> {
    let session = session.0.clone();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE user_sessions SET status = ?1, last_activity_at = ?2 WHERE session_name = ?3",
                params![status, now_ms, session],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::test_db;

    #[tokio::test]
    async fn register_and_lookup_owner() {
        let (db, _dir) = test_db().await;
        let s = SessionId::from("shop-1");
        let u = UserId::from("user-a");

        assert_eq!(session_owner(&db, &s).await.unwrap(), None);
        register_session(&db, &s, &u, 1).await.unwrap();
        assert_eq!(session_owner(&db, &s).await.unwrap(), Some(u.clone()));
        assert!(is_user_authorized(&db, &u, &s).await.unwrap());
        assert!(!is_user_authorized(&db, &UserId::from("user-b"), &s).await.unwrap());
    }

    #[tokio::test]
    async fn status_update_is_visible_in_listing() {
        let (db, _dir) = test_db().await;
        let u = UserId::from("user-a");
        register_session(&db, &SessionId::from("a"), &u, 1).await.unwrap();
        register_session(&db, &SessionId::from("b"), &UserId::from("user-b"), 2)
            .await
            .unwrap();
        update_session_status(&db, &SessionId::from("a"), SessionStatus::QrPending, 10)
            .await
            .unwrap();

        let all = list_sessions(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, Some(SessionStatus::QrPending));
        assert_eq!(all[0].last_activity_at, Some(10));
        assert_eq!(all[1].status, None);

        let mine = list_user_sessions(&db, &u).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].session_id.as_str(), "a");
    }
}
