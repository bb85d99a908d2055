// src/parsers/events.rs

//! Event list (browse page) parser.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Fields, FieldsExt};
use crate::parsers::{PageParser, element_text, parse_selector, text_lines};
use crate::utils::resolve_url;

static PERMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"permit=([\w-]+)").expect("valid permit regex"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("valid date regex"));

/// Parses the per-state, per-year event listing.
///
/// Older years render a table row per event, newer ones a block with the
/// name link followed by `<br>`-separated location and date lines; both
/// are read through the link's enclosing row or parent block.
pub struct EventListParser {
    base_url: Url,
}

impl EventListParser {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn parse_link(&self, link: &ElementRef, permit: &str, href: &str) -> Fields {
        let name = element_text(link);
        let mut fields = Fields::new();
        fields.put_text("id", permit);
        fields.put_text("permit", permit);
        fields.put_text("name", &name);
        fields.put_text("permit_url", resolve_url(&self.base_url, href));

        let context = Self::row_context(link);
        if let Some(date) = context.iter().find(|s| DATE_RE.is_match(s)) {
            fields.put_text("event_date", date);
        }
        if let Some(location) = context
            .iter()
            .find(|s| **s != name && !DATE_RE.is_match(s) && !name.contains(s.as_str()))
        {
            fields.put_text("location", location);
        }

        fields
    }

    /// Text segments surrounding an event link: the cells of its table row,
    /// or the lines of its parent block.
    fn row_context(link: &ElementRef) -> Vec<String> {
        let row = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr");

        if let Some(row) = row {
            return row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| element_text(&cell))
                .filter(|text| !text.is_empty())
                .collect();
        }

        link.parent()
            .and_then(ElementRef::wrap)
            .map(|parent| text_lines(&parent))
            .unwrap_or_default()
    }
}

impl PageParser for EventListParser {
    fn parse(&self, html: &str) -> Result<Vec<Fields>> {
        if html.trim().is_empty() {
            return Err(AppError::parse("event list", "empty page"));
        }

        let document = Html::parse_document(html);
        let link_sel = parse_selector(r#"a[href*="permit="]"#)?;

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for link in document.select(&link_sel) {
            let href = link.value().attr("href").unwrap_or_default();
            let Some(permit) = PERMIT_RE
                .captures(href)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };
            if !seen.insert(permit.clone()) {
                continue;
            }
            rows.push(self.parse_link(&link, &permit, href));
        }

        log::debug!("Event list: {} rows", rows.len());
        Ok(rows)
    }
}
