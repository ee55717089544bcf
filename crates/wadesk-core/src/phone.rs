// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat id and phone number normalization.

/// Pseudo-chat used by the transport for status broadcasts.
pub const BROADCAST_CHAT_ID: &str = "status@broadcast";

const USER_SUFFIX: &str = "@c.us";

/// Strip the `@c.us` suffix from a chat id, leaving the raw phone number.
pub fn phone_from_chat_id(chat_id: &str) -> &str {
    chat_id.strip_suffix(USER_SUFFIX).unwrap_or(chat_id)
}

/// Normalize a phone number to digits with the Israeli country code.
///
/// `050-123-4567` becomes `972501234567`; numbers already prefixed with
/// `972` are kept; bare 9-digit local numbers get the prefix.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 9 && digits.starts_with("972") {
        digits
    } else if digits.len() == 10 && digits.starts_with("05") {
        format!("972{}", &digits[1..])
    } else if digits.len() == 9 && !digits.starts_with('0') {
        format!("972{digits}")
    } else {
        digits
    }
}

/// Whether a chat id names a one-to-one conversation the engine should handle.
pub fn is_direct_chat(chat_id: &str, is_group: bool) -> bool {
    !chat_id.is_empty() && !is_group && chat_id != BROADCAST_CHAT_ID
}
