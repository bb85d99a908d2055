// src/parsers/details.rs

//! Permit page (event details) parser.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{Fields, FieldsExt};
use crate::parsers::{PageParser, element_text, parse_selector, text_lines};
use crate::utils::date::date_tokens;

/// Headings that carry the event name, most specific first.
const NAME_SELECTORS: &[&str] = &["#pgcontent h3", "h3", "h2", "title"];

static PERMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)permit\s*(?:#|number|no\.?)?\s*:?\s*(\d{4}-\d+)").expect("valid permit regex")
});
static LABELLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(location|promoter|email|e-mail|website|web site)\s*:\s*(.*)$")
        .expect("valid label regex")
});
static CITY_STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^,\d]+,\s*[A-Z]{2}$").expect("valid city/state regex"));

/// Parses the permit page into a single details row.
#[derive(Debug, Default)]
pub struct EventDetailsParser;

impl EventDetailsParser {
    pub fn new() -> Self {
        Self
    }

    fn field_for_label(label: &str) -> &'static str {
        match label.to_lowercase().as_str() {
            "location" => "location",
            "promoter" => "promoter",
            "email" | "e-mail" => "promoter_email",
            _ => "website",
        }
    }

    /// `Label: value` lines; a bare `Label:` line takes the next line.
    fn labelled_values(lines: &[String], fields: &mut Fields) {
        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = LABELLED_RE.captures(line) else {
                continue;
            };
            let key = Self::field_for_label(&caps[1]);
            if fields.contains_key(key) {
                continue;
            }
            let value = match caps[2].trim() {
                "" => lines.get(idx + 1).map(String::as_str).unwrap_or_default(),
                inline => inline,
            };
            fields.put_text(key, value);
        }
    }
}

impl PageParser for EventDetailsParser {
    fn parse(&self, html: &str) -> Result<Vec<Fields>> {
        let document = Html::parse_document(html);

        let mut name = None;
        for selector in NAME_SELECTORS {
            let selector = parse_selector(selector)?;
            name = document
                .select(&selector)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty());
            if name.is_some() {
                break;
            }
        }
        let name = name.ok_or_else(|| AppError::parse("event details", "no event name heading"))?;

        let lines = text_lines(&document.root_element());
        let body = lines.join("\n");

        let mut fields = Fields::new();
        fields.put_text("name", &name);

        if let Some(caps) = PERMIT_RE.captures(&body) {
            fields.put_text("permit", &caps[1]);
        }

        let dates = date_tokens(&body);
        if let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) {
            fields.put_text("start_date", first.format("%m/%d/%Y").to_string());
            fields.put_text("end_date", last.format("%m/%d/%Y").to_string());
        }

        Self::labelled_values(&lines, &mut fields);

        if !fields.contains_key("location") {
            if let Some(location) = lines.iter().find(|line| CITY_STATE_RE.is_match(line)) {
                fields.put_text("location", location);
            }
        }

        if !fields.contains_key("promoter_email") {
            let mailto = parse_selector(r#"a[href^="mailto:"]"#)?;
            if let Some(href) = document
                .select(&mailto)
                .find_map(|a| a.value().attr("href"))
            {
                fields.put_text("promoter_email", href.trim_start_matches("mailto:"));
            }
        }

        if !fields.contains_key("website") {
            let external = parse_selector(r#"a[href^="http"]"#)?;
            if let Some(href) = document
                .select(&external)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| !href.contains("usacycling.org"))
            {
                fields.put_text("website", href);
            }
        }

        Ok(vec![fields])
    }
}
