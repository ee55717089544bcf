// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Muted phone numbers with optional expiry.

use rusqlite::{OptionalExtension, params};
use tracing::debug;
use wadesk_core::WadeskError;
use wadesk_core::events::MuteMap;
use wadesk_core::types::{MuteDuration, SessionId, UserId};

use crate::database::{Database, map_tr_err};

/// Whether `phone` is muted at `now_ms`. Expired rows are deleted on read.
pub async fn is_muted(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    phone: &str,
    now_ms: i64,
) -> Result<bool, WadeskError> {
    let (user, session, phone) = (user.0.clone(), session.0.clone(), phone.to_string());
    db.connection()
        .call(move |conn| {
            let entry: Option<Option<i64>> = conn
                .query_row(
                    "SELECT mute_until FROM muted_numbers
                     WHERE user_id = ?1 AND session_name = ?2 AND phone = ?3",
                    params![user, session, phone],
                    |row| row.get(0),
                )
                .optional()?;
            match entry {
                None => Ok(false),
                Some(None) => Ok(true),
                Some(Some(until)) if until > now_ms => Ok(true),
                Some(Some(_)) => {
                    conn.execute(
                        "DELETE FROM muted_numbers
                         WHERE user_id = ?1 AND session_name = ?2 AND phone = ?3",
                        params![user, session, phone],
                    )?;
                    debug!(phone = %phone, "mute expired, removed");
                    Ok(false)
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mute(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    phone: &str,
    duration: MuteDuration,
    now_ms: i64,
) -> Result<(), WadeskError> {
    let (user, session, phone) = (user.0.clone(), session.0.clone(), phone.to_string());
    let until = duration.expires_at(now_ms);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO muted_numbers (user_id, session_name, phone, mute_until)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, session_name, phone) DO UPDATE SET mute_until = excluded.mute_until",
                params![user, session, phone, until],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn unmute(
    db: &Database,
    user: &UserId,
    session: &SessionId,
    phone: &str,
) -> Result<(), WadeskError> {
    let (user, session, phone) = (user.0.clone(), session.0.clone(), phone.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM muted_numbers WHERE user_id = ?1 AND session_name = ?2 AND phone = ?3",
                params![user, session, phone],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Phone → expiry across all of `user`'s sessions.
pub async fn user_mutes(db: &Database, user: &UserId) -> Result<MuteMap, WadeskError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT phone, mute_until FROM muted_numbers WHERE user_id = ?1")?;
            let rows = stmt.query_map(params![user], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::test_db;

    #[tokio::test]
    async fn forever_mute_never_expires() {
        let (db, _dir) = test_db().await;
        let (u, s) = (UserId::from("u"), SessionId::from("s"));
        mute(&db, &u, &s, "972501234567", MuteDuration::Forever, 0).await.unwrap();
        assert!(is_muted(&db, &u, &s, "972501234567", i64::MAX).await.unwrap());
        assert_eq!(user_mutes(&db, &u).await.unwrap()["972501234567"], None);
    }

    #[tokio::test]
    async fn expired_mute_is_removed_on_read() {
        let (db, _dir) = test_db().await;
        let (u, s) = (UserId::from("u"), SessionId::from("s"));
        mute(&db, &u, &s, "972501234567", MuteDuration::Hours(1), 0).await.unwrap();

        assert!(is_muted(&db, &u, &s, "972501234567", 3_599_999).await.unwrap());
        assert!(!is_muted(&db, &u, &s, "972501234567", 3_600_000).await.unwrap());
        assert!(user_mutes(&db, &u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mute_is_scoped_to_session() {
        let (db, _dir) = test_db().await;
        let u = UserId::from("u");
        mute(&db, &u, &SessionId::from("a"), "1", MuteDuration::Forever, 0)
            .await
            .unwrap();
        assert!(!is_muted(&db, &u, &SessionId::from("b"), "1", 0).await.unwrap());
        unmute(&db, &u, &SessionId::from("a"), "1").await.unwrap();
        assert!(!is_muted(&db, &u, &SessionId::from("a"), "1", 0).await.unwrap());
    }
}
