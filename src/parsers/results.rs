// src/parsers/results.rs

//! Category listing and race result parsers.

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Fields, FieldsExt};
use crate::parsers::{PageParser, element_text, parse_selector};
use crate::utils::date::date_tokens;
use crate::utils::extract::{category_traits, extract_race_id, strip_trailing_date};

/// Parses category markup returned by `loadInfoID` and result tables
/// returned by the race results endpoint.
#[derive(Debug, Default)]
pub struct RaceResultsParser;

impl RaceResultsParser {
    pub fn new() -> Self {
        Self
    }

    /// Categories in a discipline's markup. Any element whose `id` or
    /// `onclick` carries `race_NUMBER` is a category; nested duplicates of
    /// the same race collapse to the outermost element.
    pub fn parse_categories(&self, markup: &str, info_id: &str, label: &str) -> Result<Vec<Fields>> {
        let fragment = Html::parse_fragment(markup);
        let candidates = parse_selector("[id], [onclick]")?;
        let discipline = strip_trailing_date(label);

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for element in fragment.select(&candidates) {
            let attrs = element.value();
            let Some(race_id) = attrs
                .attr("id")
                .and_then(extract_race_id)
                .or_else(|| attrs.attr("onclick").and_then(extract_race_id))
            else {
                continue;
            };
            if !seen.insert(race_id.clone()) {
                continue;
            }

            let name = strip_trailing_date(&element_text(&element));
            let traits = category_traits(&name);

            let mut fields = Fields::new();
            fields.put_text("id", &race_id);
            fields.put_text("name", &name);
            fields.put_text("info_id", info_id);
            fields.put_text("discipline", &discipline);
            for (key, value) in [
                ("gender", traits.gender),
                ("category_type", traits.category_type),
                ("age_range", traits.age_range),
                ("category_rank", traits.category_rank),
            ] {
                if let Some(value) = value {
                    fields.put_text(key, value);
                }
            }
            rows.push(fields);
        }

        log::debug!("Discipline {}: {} categories", info_id, rows.len());
        Ok(rows)
    }

    /// Field key for a result table header.
    fn column_key(header: &str) -> Option<&'static str> {
        let header = header.trim().to_lowercase();
        let key = if header.contains("place") || matches!(header.as_str(), "pl" | "pos" | "position")
        {
            "place"
        } else if header.contains("point") || header == "pts" {
            "points"
        } else if header.contains("usac") || header.contains("license") || header == "lic" {
            "usac_number"
        } else if header.contains("team") || header.contains("club") {
            "team"
        } else if header.contains("name") || header.contains("rider") {
            "name"
        } else if header == "city" {
            "city"
        } else if header == "state" || header == "st" {
            "state"
        } else if header.contains("time") {
            "time"
        } else if header.contains("bib") {
            "bib"
        } else {
            return None;
        };
        Some(key)
    }

    fn cell_texts(row: &ElementRef) -> Result<Vec<String>> {
        let cell_sel = parse_selector("th, td")?;
        Ok(row.select(&cell_sel).map(|cell| element_text(&cell)).collect())
    }
}

impl PageParser for RaceResultsParser {
    /// One row holding `category`, `date`, optional `id` and a `riders`
    /// array of per-rider field objects.
    fn parse(&self, html: &str) -> Result<Vec<Fields>> {
        let document = Html::parse_document(html);
        let table_sel = parse_selector("table")?;
        let row_sel = parse_selector("tr")?;

        for table in document.select(&table_sel) {
            let rows: Vec<ElementRef> = table.select(&row_sel).collect();

            let mut header = None;
            for (idx, row) in rows.iter().enumerate() {
                let columns: Vec<Option<&'static str>> = Self::cell_texts(row)?
                    .iter()
                    .map(|text| Self::column_key(text))
                    .collect();
                if columns.contains(&Some("name")) {
                    header = Some((idx, columns));
                    break;
                }
            }
            let Some((header_idx, columns)) = header else {
                continue;
            };

            let mut riders = Vec::new();
            for row in &rows[header_idx + 1..] {
                let cells = Self::cell_texts(row)?;
                if cells.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                let mut rider = Fields::new();
                for (key, cell) in columns.iter().zip(&cells) {
                    if let Some(key) = key {
                        rider.put_text(key, cell);
                    }
                }
                riders.push(Value::Object(rider));
            }

            let mut fields = Fields::new();
            let heading_sel = parse_selector("h2, h3, h4")?;
            if let Some(heading) = document
                .select(&heading_sel)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
            {
                fields.put_text("category", strip_trailing_date(&heading));
                if let Some(date) = date_tokens(&heading).first() {
                    fields.put_text("date", date.format("%m/%d/%Y").to_string());
                }
            }

            let id_sel = parse_selector("[id]")?;
            if let Some(race_id) = document
                .select(&id_sel)
                .find_map(|el| el.value().attr("id").and_then(extract_race_id))
            {
                fields.put_text("id", race_id);
            }

            fields.insert("riders".to_string(), Value::Array(riders));
            return Ok(vec![fields]);
        }

        Err(AppError::parse(
            "race results",
            "no result table with a name column",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_markup() {
        let markup = r#"
            <ul id="results_list">
              <li id="race_101"><a href="javascript:void(0)" onclick="loadResults('race_101')">Men Cat 1/2 05/10/2021</a></li>
              <li><a href='#' onclick="showRace(this, 'race_102')">Masters Women 45+</a></li>
              <li><a href='#' onclick="window.print()">Print</a></li>
            </ul>"#;
        let rows = RaceResultsParser::new()
            .parse_categories(markup, "1234", "Road 05/10/2021")
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("id").as_deref(), Some("101"));
        assert_eq!(rows[0].text("name").as_deref(), Some("Men Cat 1/2"));
        assert_eq!(rows[0].text("info_id").as_deref(), Some("1234"));
        assert_eq!(rows[0].text("discipline").as_deref(), Some("Road"));
        assert_eq!(rows[0].text("category_rank").as_deref(), Some("1/2"));
        assert_eq!(rows[1].text("id").as_deref(), Some("102"));
        assert_eq!(rows[1].text("gender").as_deref(), Some("Women"));
        assert_eq!(rows[1].text("age_range").as_deref(), Some("45+"));
    }

    #[test]
    fn markup_without_races_has_no_categories() {
        let rows = RaceResultsParser::new()
            .parse_categories("<p>No results posted</p>", "1", "Road")
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn parses_result_table() {
        let html = r#"
            <div id="race_987">
              <h3>Men Cat 1/2 05/10/2021</h3>
              <table>
                <tr><th>Place</th><th>Points</th><th>Name</th><th>City</th><th>State</th><th>Time</th><th>Team</th></tr>
                <tr><td>1</td><td>10</td><td>First Rider</td><td>Boulder</td><td>CO</td><td>2:01:33</td><td>Team A</td></tr>
                <tr><td></td><td></td><td></td><td></td><td></td><td></td><td></td></tr>
                <tr><td>DNF</td><td></td><td>Second Rider</td><td>Denver</td><td>CO</td><td></td><td></td></tr>
              </table>
            </div>"#;
        let rows = RaceResultsParser::new().parse(html).unwrap();
        let fields = &rows[0];

        assert_eq!(fields.text("id").as_deref(), Some("987"));
        assert_eq!(fields.text("category").as_deref(), Some("Men Cat 1/2"));
        assert_eq!(fields.text("date").as_deref(), Some("05/10/2021"));

        let riders = fields["riders"].as_array().unwrap();
        assert_eq!(riders.len(), 2);
        let first = riders[0].as_object().unwrap();
        assert_eq!(first.text("name").as_deref(), Some("First Rider"));
        assert_eq!(first.text("team").as_deref(), Some("Team A"));
        assert_eq!(first.text("points").as_deref(), Some("10"));
        let second = riders[1].as_object().unwrap();
        assert_eq!(second.text("place").as_deref(), Some("DNF"));
        assert_eq!(second.text("points"), None);
    }

    #[test]
    fn header_mapping() {
        assert_eq!(RaceResultsParser::column_key("Team Name"), Some("team"));
        assert_eq!(RaceResultsParser::column_key("Rider"), Some("name"));
        assert_eq!(RaceResultsParser::column_key("USAC #"), Some("usac_number"));
        assert_eq!(RaceResultsParser::column_key("Pl"), Some("place"));
        assert_eq!(RaceResultsParser::column_key("Photo"), None);
    }

    #[test]
    fn page_without_table_is_a_parse_error() {
        let result = RaceResultsParser::new().parse("<h3>Men Cat 5</h3><p>Pending</p>");
        assert!(matches!(result, Err(AppError::Parse { .. })));
    }
}
