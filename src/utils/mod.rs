//! Utility functions and helpers.

pub mod date;
pub mod extract;
pub mod http;

use std::fmt::Display;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the successful items of a batch, logging each failure as a warning.
///
/// `what` names the item kind in the log line (e.g. "rider").
pub fn keep_valid<T, E, I>(items: I, what: &str) -> Vec<T>
where
    I: IntoIterator<Item = std::result::Result<T, E>>,
    E: Display,
{
    items
        .into_iter()
        .filter_map(|item| match item {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Skipping {}: {}", what, e);
                None
            }
        })
        .collect()
}
