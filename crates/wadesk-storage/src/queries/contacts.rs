// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contacts keyed by `(user, normalized phone)`.

use rusqlite::{OptionalExtension, params};
use wadesk_core::WadeskError;
use wadesk_core::records::{Contact, ContactDetails};
use wadesk_core::types::UserId;

use crate::database::{Database, map_tr_err};

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        phone: row.get(0)?,
        contact_name: row.get(1)?,
        business_field: row.get(2)?,
        notes: row.get(3)?,
    })
}

/// Upsert the contact, touching only the fields present in `details`.
pub async fn upsert_contact(
    db: &Database,
    user: &UserId,
    phone: &str,
    details: &ContactDetails,
    now_ms: i64,
) -> Result<(), WadeskError> {
    let (user, phone) = (user.0.clone(), phone.to_string());
    let details = details.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO contacts (user_id, phone, updated_at) VALUES (?1, ?2, ?3)",
                params![user, phone, now_ms],
            )?;
            let columns = [
                ("contact_name", &details.contact_name),
                ("business_field", &details.business_field),
                ("notes", &details.notes),
            ];
            for (column, value) in columns {
                if let Some(value) = value {
                    tx.execute(
                        &format!("UPDATE contacts SET {column} = ?1 WHERE user_id = ?2 AND phone = ?3"),
                        params![value, user, phone],
                    )?;
                }
            }
            tx.execute(
                "UPDATE contacts SET updated_at = ?1 WHERE user_id = ?2 AND phone = ?3",
                params![now_ms, user, phone],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contact(
    db: &Database,
    user: &UserId,
    phone: &str,
) -> Result<Option<Contact>, WadeskError> {
    let (user, phone) = (user.0.clone(), phone.to_string());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT phone, contact_name, business_field, notes FROM contacts
                 WHERE user_id = ?1 AND phone = ?2",
                params![user, phone],
                row_to_contact,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn user_contacts(db: &Database, user: &UserId) -> Result<Vec<Contact>, WadeskError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT phone, contact_name, business_field, notes FROM contacts
                 WHERE user_id = ?1 ORDER BY phone",
            )?;
            let rows = stmt.query_map(params![user], row_to_contact)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
