// src/utils/date.rs

//! Date normalization for free-text dates scraped from result pages.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

/// Formats tried in order against the whole (whitespace-normalized) string.
///
/// `%y` must precede `%Y`, which also accepts a two-digit year.
const FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%B %d %Y",
];

static DATE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})\b").expect("valid date token regex")
});

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a date, returning `None` when no known format matches.
///
/// The whole string is tried first; failing that, the first embedded
/// `M/D/YYYY` or `YYYY-MM-DD` token wins, so ranges like
/// `03/07/2020 - 03/08/2020` resolve to their first day.
pub fn try_parse_date(text: &str) -> Option<NaiveDate> {
    let text = super::normalize_whitespace(text);
    if text.is_empty() {
        return None;
    }

    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
        .or_else(|| date_tokens(&text).into_iter().next())
}

/// Parse a date, falling back to `fallback` when nothing matches.
pub fn parse_date_or(text: &str, fallback: NaiveDate) -> NaiveDate {
    try_parse_date(text).unwrap_or_else(|| {
        log::debug!("Unrecognized date {:?}, using {}", text, fallback);
        fallback
    })
}

/// Parse a date, falling back to today. Never fails.
pub fn parse_date(text: &str) -> NaiveDate {
    parse_date_or(text, today())
}

/// Every parseable date token embedded in `text`, in order of appearance.
pub fn date_tokens(text: &str) -> Vec<NaiveDate> {
    DATE_TOKEN_RE
        .find_iter(text)
        .filter_map(|m| {
            let token = m.as_str();
            NaiveDate::parse_from_str(token, "%m/%d/%Y")
                .or_else(|_| NaiveDate::parse_from_str(token, "%Y-%m-%d"))
                .ok()
        })
        .collect()
}
