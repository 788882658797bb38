use chrono::{DateTime, Utc};

use crate::models::parse_timestamp;

/// `January 5, 2024`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Same as [`format_date`] for a raw ISO timestamp; `None` if it does not parse.
pub fn format_date_str(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|date| format_date(&date))
}

/// Cuts to `max_chars` characters and appends `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn count_characters(text: &str) -> usize {
    text.chars().count()
}
