//! Page parsers.
//!
//! Each parser turns one page's markup into loosely typed [`Fields`]
//! rows. Absent optional keys are normal; markup that cannot be
//! recognized at all is a parse error.

mod details;
mod events;
mod results;

pub use details::EventDetailsParser;
pub use events::EventListParser;
pub use results::RaceResultsParser;

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::models::Fields;
use crate::utils::normalize_whitespace;

/// Turns one page of markup into field rows.
pub trait PageParser {
    fn parse(&self, html: &str) -> Result<Vec<Fields>>;
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Whitespace-normalized text content of an element.
pub(crate) fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Non-empty text segments of an element, one per text node.
pub(crate) fn text_lines(element: &ElementRef) -> Vec<String> {
    element
        .text()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}
