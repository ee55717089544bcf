// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs on the
//! single tokio-rusqlite thread.

pub mod calls;
pub mod contacts;
pub mod labels;
pub mod messages;
pub mod mutes;
pub mod sessions;
pub mod settings;

use std::str::FromStr;

/// Parse a TEXT column into a strum enum, reporting bad values as conversion failures.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
