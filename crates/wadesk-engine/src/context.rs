// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly for LLM requests.
//!
//! Turns the stored chat history plus the text being answered into the
//! message list sent to the model, with the user's instructions as the
//! system prompt.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use wadesk_core::StoredMessage;
use wadesk_core::chat::ChatMessage;
use wadesk_core::settings::AiSettings;
use wadesk_core::types::Role;

/// Replaced with the local HH:MM time in the instructions.
pub const TIME_PLACEHOLDER: &str = "{current_time_israel}";

/// Default number of recent messages to include in context.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Result of context assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptContext {
    /// System prompt followed by the conversation, oldest first.
    Ready(Vec<ChatMessage>),
    /// Nothing at all to answer.
    NoHistory,
    /// Only the system prompt survived filtering.
    InsufficientContext,
}

/// Instructions with [`TIME_PLACEHOLDER`] swapped for the time in `tz`.
pub fn system_prompt(instructions: &str, now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz).format("%H:%M").to_string();
    instructions.replacen(TIME_PLACEHOLDER, &local, 1)
}

/// Assemble the prompt for one turn.
///
/// `current_text` is appended as a user message unless the latest user message in
/// `history` already carries it (it normally does, since the inbound row is persisted
/// first; voice transcripts arrive after the placeholder row and are appended).
pub fn build_context(
    history: &[StoredMessage],
    current_text: &str,
    settings: &AiSettings,
    now: DateTime<Utc>,
    tz: Tz,
    limit: usize,
) -> PromptContext {
    let mut turns: Vec<ChatMessage> = history
        .iter()
        .map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()),
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
        })
        .collect();

    let latest_user = history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str());
    let current = current_text.trim();
    if !current.is_empty() && latest_user != Some(current) {
        turns.push(ChatMessage::user(current));
    }

    if turns.is_empty() {
        return PromptContext::NoHistory;
    }

    let start = turns.len().saturating_sub(limit);
    let mut messages = Vec::with_capacity(turns.len() - start + 1);
    messages.push(ChatMessage::system(system_prompt(
        &settings.instructions,
        now,
        tz,
    )));
    messages.extend(
        turns
            .into_iter()
            .skip(start)
            .filter(|m| !m.content.trim().is_empty()),
    );

    if messages.len() <= 1 {
        return PromptContext::InsufficientContext;
    }
    PromptContext::Ready(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wadesk_core::{MessageId, SessionId, UserId};

    fn row(role: Role, content: &str, n: i64) -> StoredMessage {
        StoredMessage::new(
            UserId::from("u1"),
            SessionId::from("s1"),
            "972501234567@c.us",
            MessageId(format!("m{n}")),
            role,
            content,
            n,
        )
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn injects_local_time_once() {
        let prompt = system_prompt(
            "Now {current_time_israel}. Again {current_time_israel}.",
            noon_utc(),
            chrono_tz::Asia::Jerusalem,
        );
        assert_eq!(prompt, "Now 14:00. Again {current_time_israel}.");
    }

    #[test]
    fn does_not_duplicate_persisted_text() {
        let history = vec![
            row(Role::User, "hi", 1),
            row(Role::Assistant, "hello!", 2),
            row(Role::User, "price?", 3),
        ];
        let ctx = build_context(
            &history,
            "price?",
            &AiSettings::default(),
            noon_utc(),
            chrono_tz::UTC,
            20,
        );
        let PromptContext::Ready(messages) = ctx else {
            panic!("expected ready context");
        };
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[3].content, "price?");
    }

    #[test]
    fn appends_transcript_after_placeholder() {
        let history = vec![row(Role::User, "[Voice Message]", 1)];
        let ctx = build_context(
            &history,
            "call me tomorrow",
            &AiSettings::default(),
            noon_utc(),
            chrono_tz::UTC,
            20,
        );
        let PromptContext::Ready(messages) = ctx else {
            panic!("expected ready context");
        };
        assert_eq!(messages.last().unwrap().content, "call me tomorrow");
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn keeps_only_the_newest_turns() {
        let history: Vec<_> = (0..30)
            .map(|n| row(Role::User, &format!("msg {n}"), n))
            .collect();
        let ctx = build_context(
            &history,
            "msg 29",
            &AiSettings::default(),
            noon_utc(),
            chrono_tz::UTC,
            20,
        );
        let PromptContext::Ready(messages) = ctx else {
            panic!("expected ready context");
        };
        assert_eq!(messages.len(), 21);
        assert_eq!(messages[1].content, "msg 10");
    }

    #[test]
    fn empty_inputs() {
        let ctx = build_context(
            &[],
            "  ",
            &AiSettings::default(),
            noon_utc(),
            chrono_tz::UTC,
            20,
        );
        assert_eq!(ctx, PromptContext::NoHistory);

        let blank = vec![row(Role::Assistant, " ", 1)];
        let ctx = build_context(
            &blank,
            "",
            &AiSettings::default(),
            noon_utc(),
            chrono_tz::UTC,
            20,
        );
        assert_eq!(ctx, PromptContext::InsufficientContext);
    }
}
