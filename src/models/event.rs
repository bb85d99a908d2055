//! Event and event-details records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Fields, FieldsExt};
use crate::utils::date::{parse_date_or, try_parse_date};

/// An event listed for a state and year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// Permit number (e.g. "2020-26"); empty when the listing omits it
    pub permit_number: String,
    pub date: Option<NaiveDate>,
    pub location: String,
    pub state: String,
    pub year: i32,
    pub url: Option<String>,
}

impl Event {
    /// Build an event from one event-list row.
    ///
    /// `event_date` goes through the date normalizer; when present but
    /// unparseable it becomes `today`.
    pub fn from_fields(fields: &Fields, state: &str, year: i32, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            id: fields.require("Event", "id")?,
            name: fields.require("Event", "name")?,
            permit_number: fields.text("permit").unwrap_or_default(),
            date: fields
                .text("event_date")
                .map(|raw| parse_date_or(&raw, today)),
            location: fields
                .text("location")
                .unwrap_or_else(|| "Unknown".to_string()),
            state: state.to_string(),
            year,
            url: fields.text("permit_url"),
        })
    }
}

/// Details from an event's permit page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDetails {
    pub permit: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub promoter: Option<String>,
    pub promoter_email: Option<String>,
    pub website: Option<String>,
}

impl EventDetails {
    /// Build details from the permit-page field set. `permit` is used when
    /// the page itself does not repeat it.
    pub fn from_fields(fields: &Fields, permit: &str) -> Result<Self> {
        let start_date = fields.text("start_date").and_then(|d| try_parse_date(&d));
        let end_date = fields
            .text("end_date")
            .and_then(|d| try_parse_date(&d))
            .or(start_date);

        Ok(Self {
            permit: fields.text("permit").unwrap_or_else(|| permit.to_string()),
            name: fields.require("EventDetails", "name")?,
            start_date,
            end_date,
            location: fields.text("location"),
            promoter: fields.text("promoter"),
            promoter_email: fields.text("promoter_email"),
            website: fields.text("website"),
        })
    }
}
