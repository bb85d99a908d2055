//! Page fetching for the legacy results site.
//!
//! The orchestrator only sees the [`PageFetcher`] trait: one blocking call
//! per page that returns a [`Payload`] or a network/parse error. Caching,
//! retries and request pacing live behind it in [`HttpFetcher`].

mod cache;
mod http;

pub use cache::ResponseCache;
pub use http::HttpFetcher;

use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::models::Fields;

/// A page the client knows how to ask for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// Events for a state and year
    EventList { state: String, year: i32 },
    /// Event page of a permit (details and discipline links)
    Permit { permit: String },
    /// Categories of a discipline, as loaded by `loadInfoID`
    LoadInfo { info_id: String, label: String },
    /// Result table of a race
    RaceResults { race_id: String },
}

impl PageRequest {
    /// Absolute URL of this page under `base`.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let url = match self {
            Self::EventList { state, year } => {
                let mut url = base.join("browse.php")?;
                url.query_pairs_mut()
                    .append_pair("state", state)
                    .append_pair("race", "")
                    .append_pair("fyear", &year.to_string());
                url
            }
            Self::Permit { permit } => {
                let mut url = base.clone();
                url.query_pairs_mut().clear().append_pair("permit", permit);
                url
            }
            Self::LoadInfo { info_id, label } => {
                let mut url = base.join("index.php")?;
                url.query_pairs_mut()
                    .append_pair("ajax", "1")
                    .append_pair("act", "infoid")
                    .append_pair("info_id", info_id)
                    .append_pair("label", label);
                url
            }
            Self::RaceResults { race_id } => {
                let mut url = base.join("index.php")?;
                url.query_pairs_mut()
                    .append_pair("ajax", "1")
                    .append_pair("act", "loadresults")
                    .append_pair("race_id", race_id);
                url
            }
        };
        Ok(url)
    }

    /// Stable key for the response cache.
    pub fn cache_key(&self) -> String {
        match self {
            Self::EventList { state, year } => format!("events/{state}/{year}"),
            Self::Permit { permit } => format!("permit/{permit}"),
            Self::LoadInfo { info_id, label } => format!("infoid/{info_id}/{label}"),
            Self::RaceResults { race_id } => format!("results/{race_id}"),
        }
    }
}

/// Raw response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Html(String),
    Json(Value),
}

impl Payload {
    /// Classify a body: JSON objects/arrays become [`Payload::Json`].
    pub fn from_body(body: String) -> Self {
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return Self::Json(value);
            }
        }
        Self::Html(body)
    }

    /// Markup carried by the payload. AJAX responses wrap it in `message`.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Html(html) => Some(html),
            Self::Json(Value::String(html)) => Some(html),
            Self::Json(Value::Object(map)) => map.get("message").and_then(Value::as_str),
            Self::Json(_) => None,
        }
    }

    /// Interpret a load-info response.
    pub fn into_load_info(self) -> LoadInfo {
        if let Self::Json(Value::Object(map)) = &self {
            if let Some(Value::Array(entries)) = map.get("categories") {
                return LoadInfo::Structured(
                    entries
                        .iter()
                        .filter_map(|entry| entry.as_object().cloned())
                        .collect(),
                );
            }
        }
        match self.html() {
            Some(html) => LoadInfo::Markup(html.to_string()),
            None => LoadInfo::Empty,
        }
    }
}

/// The two shapes the load-info endpoint answers with.
///
/// Normally it returns category markup; some events answer with an object
/// holding a `categories` array of `{id, name}` entries instead.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadInfo {
    /// Category markup for the category parser
    Markup(String),
    /// Pre-structured category entries
    Structured(Vec<Fields>),
    /// Neither shape
    Empty,
}

/// Source of raw pages.
pub trait PageFetcher {
    /// Fetch one page; fails with a network or parse error.
    fn fetch(&self, request: &PageRequest) -> Result<Payload>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch(&self, request: &PageRequest) -> Result<Payload> {
        (**self).fetch(request)
    }
}
