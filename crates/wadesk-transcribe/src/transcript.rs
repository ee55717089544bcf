// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript extraction from whisper's text output.

use std::sync::LazyLock;

use regex::Regex;

static TIMESTAMP_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d{2}:").unwrap());
static WARNING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+Warning:").unwrap());

/// Join the meaningful lines of `output` with single spaces.
///
/// Blank lines, timestamped segment lines and Python warning lines are dropped.
pub fn extract_transcript(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !TIMESTAMP_LINE.is_match(l) && !WARNING_LINE.is_match(l))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_plain_lines() {
        assert_eq!(extract_transcript("שלום\n  מה שלומך \n\n"), "שלום מה שלומך");
    }

    #[test]
    fn drops_timestamps_and_warnings() {
        let raw = "UserWarning: FP16 is not supported on CPU\n\
                   [00:00.000 --> 00:02.000] שלום\n\
                   אני רוצה לקבוע שיחה";
        assert_eq!(extract_transcript(raw), "אני רוצה לקבוע שיחה");
    }

    #[test]
    fn empty_output_is_empty() {
        assert_eq!(extract_transcript(""), "");
        assert_eq!(extract_transcript("   \n\t\n"), "");
    }
}
