//! Discipline, category, race and result records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{EventDetails, Fields, FieldsExt};
use crate::utils::date::parse_date_or;
use crate::utils::keep_valid;

/// A discipline (Road, Criterium, ...) offered at an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discipline {
    /// Info id used by the category endpoint
    pub id: String,
    /// Display name without its trailing date
    pub name: String,
    /// Label passed back to the site, e.g. "Road 05/10/2021"
    pub label: String,
}

/// A rider grouping within a discipline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceCategory {
    /// Race id of this category's result set
    pub id: String,
    pub name: String,
    pub event_id: String,
    pub discipline: Option<String>,
    pub gender: Option<String>,
    pub category_type: Option<String>,
    pub age_range: Option<String>,
    pub category_rank: Option<String>,
}

impl RaceCategory {
    /// Build a category; `event_id` falls back to the row's `info_id`.
    pub fn from_fields(fields: &Fields) -> Result<Self> {
        let event_id = fields
            .text("event_id")
            .or_else(|| fields.text("info_id"))
            .ok_or_else(|| AppError::missing_field("RaceCategory", "event_id"))?;

        Ok(Self {
            id: fields.require("RaceCategory", "id")?,
            name: fields.require("RaceCategory", "name")?,
            event_id,
            discipline: fields.text("discipline"),
            gender: fields.text("gender"),
            category_type: fields.text("category_type"),
            age_range: fields.text("age_range"),
            category_rank: fields.text("category_rank"),
        })
    }
}

/// A race discovered for a permit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceEntry {
    pub id: String,
    pub discipline_id: String,
    pub discipline_name: String,
    pub name: String,
    pub permit: String,
}

impl RaceEntry {
    pub fn new(
        id: impl Into<String>,
        discipline: &Discipline,
        name: impl Into<String>,
        permit: &str,
    ) -> Self {
        Self {
            id: id.into(),
            discipline_id: discipline.id.clone(),
            discipline_name: discipline.name.clone(),
            name: name.into(),
            permit: permit.to_string(),
        }
    }
}

/// One row of a result table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rider {
    /// Finishing place as printed ("1", "DNF", ...)
    pub place: String,
    pub name: String,
    pub usac_number: Option<String>,
    pub team: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub time: Option<String>,
    pub points: Option<u32>,
    pub bib: Option<String>,
}

impl Rider {
    pub fn from_fields(fields: &Fields) -> Result<Self> {
        let points = fields
            .text("points")
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    AppError::invalid_record("Rider", format!("points {raw:?} is not a number"))
                })
            })
            .transpose()?;

        Ok(Self {
            place: fields.require("Rider", "place")?,
            name: fields.require("Rider", "name")?,
            usac_number: fields.text("usac_number"),
            team: fields.text("team"),
            city: fields.text("city"),
            state: fields.text("state"),
            time: fields.text("time"),
            points,
            bib: fields.text("bib"),
        })
    }
}

/// Results of one race.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceResult {
    pub id: String,
    pub event_id: String,
    pub category: String,
    pub date: NaiveDate,
    pub riders: Vec<Rider>,
}

impl RaceResult {
    /// Assemble a result from a parsed result page.
    ///
    /// Missing `id` → `race_id`; missing `event_id` → the result id;
    /// missing or unparseable `date` → `today`; missing `category` → the
    /// supplied category's name. Invalid rider rows are dropped with a
    /// warning.
    pub fn from_fields(
        fields: &Fields,
        race_id: &str,
        category_info: Option<&RaceCategory>,
        today: NaiveDate,
    ) -> Result<Self> {
        let id = fields.text("id").unwrap_or_else(|| race_id.to_string());
        let event_id = fields.text("event_id").unwrap_or_else(|| id.clone());
        let date = fields
            .text("date")
            .map(|raw| parse_date_or(&raw, today))
            .unwrap_or(today);
        let category = fields
            .text("category")
            .or_else(|| category_info.map(|c| c.name.clone()))
            .ok_or_else(|| AppError::missing_field("RaceResult", "category"))?;

        let rows: &[Value] = match fields.get("riders") {
            Some(Value::Array(rows)) => rows.as_slice(),
            _ => &[],
        };
        let riders = keep_valid(
            rows.iter().map(|row| match row {
                Value::Object(row) => Rider::from_fields(row),
                other => Err(AppError::invalid_record(
                    "Rider",
                    format!("expected an object, got {other}"),
                )),
            }),
            &format!("rider in race {id}"),
        );

        Ok(Self {
            id,
            event_id,
            category,
            date,
            riders,
        })
    }
}

/// Everything known about one permit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompleteEventData {
    pub details: EventDetails,
    pub disciplines: Vec<Discipline>,
    pub categories: Vec<RaceCategory>,
    /// Results keyed by race id
    pub results: BTreeMap<String, RaceResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn category_event_id_falls_back_to_info_id() {
        let row = fields(json!({ "id": "55", "name": "Men Cat 3", "info_id": "1234" }));
        let category = RaceCategory::from_fields(&row).unwrap();
        assert_eq!(category.event_id, "1234");
    }

    #[test]
    fn category_without_any_event_id_is_invalid() {
        let row = fields(json!({ "id": "55", "name": "Men Cat 3" }));
        assert!(matches!(
            RaceCategory::from_fields(&row),
            Err(AppError::InvalidRecord { record: "RaceCategory", .. })
        ));
    }

    #[test]
    fn rider_rejects_non_numeric_points() {
        let row = fields(json!({ "place": "1", "name": "A Rider", "points": "lots" }));
        assert!(Rider::from_fields(&row).is_err());
    }

    #[test]
    fn result_event_id_defaults_to_own_id() {
        let page = fields(json!({ "id": "987", "category": "Men Cat 1/2", "date": "05/10/2021" }));
        let result = RaceResult::from_fields(&page, "987", None, ymd(2030, 1, 1)).unwrap();

        assert_eq!(result.event_id, "987");
        assert_eq!(result.date, ymd(2021, 5, 10));
        assert!(result.riders.is_empty());
    }

    #[test]
    fn result_date_defaults_to_today() {
        let today = ymd(2030, 1, 1);
        let page = fields(json!({ "category": "Women Open" }));
        let result = RaceResult::from_fields(&page, "5", None, today).unwrap();

        assert_eq!(result.id, "5");
        assert_eq!(result.date, today);
    }

    #[test]
    fn result_category_from_category_info() {
        let category = RaceCategory::from_fields(&fields(json!({
            "id": "5", "name": "Junior Boys 15-16", "info_id": "9"
        })))
        .unwrap();
        let result =
            RaceResult::from_fields(&Fields::new(), "5", Some(&category), ymd(2030, 1, 1)).unwrap();
        assert_eq!(result.category, "Junior Boys 15-16");
    }

    #[test]
    fn result_without_category_is_invalid() {
        assert!(RaceResult::from_fields(&Fields::new(), "5", None, ymd(2030, 1, 1)).is_err());
    }

    #[test]
    fn malformed_rider_rows_are_dropped() {
        let page = fields(json!({
            "id": "987",
            "category": "Men Cat 4",
            "riders": [
                { "place": "1", "name": "First Rider", "points": "10" },
                { "place": "2" },
                { "place": "3", "name": "Third Rider" },
            ],
        }));
        let result = RaceResult::from_fields(&page, "987", None, ymd(2030, 1, 1)).unwrap();

        let names: Vec<_> = result.riders.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First Rider", "Third Rider"]);
        assert_eq!(result.riders[0].points, Some(10));
    }
}
