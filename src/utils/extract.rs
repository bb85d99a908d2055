// src/utils/extract.rs

//! Identifier extraction from inline script attributes and display text.
//!
//! The results site routes navigation through `onclick` handlers such as
//! `loadInfoID(1234, 'Road 05/10/2021')` or markup carrying `race_987`.
//! Everything here is pattern matching over text; a non-matching input
//! yields `None` rather than an error.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Name of the script function that loads a discipline.
pub const DISCIPLINE_HANDLER: &str = "loadInfoID";

static HANDLER_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\(\s*(\d+)\s*(?:,\s*(?:'([^']*)'|"([^"]*)"))?"#)
        .expect("valid handler args regex")
});
static RACE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"race_(\d+)").expect("valid race id regex"));
static TRAILING_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{2}/\d{2}/\d{4}$").expect("valid trailing date regex"));

static RANK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcat(?:egory|s)?\.?\s*([1-5](?:\s*[/,&-]\s*[1-5])*)")
        .expect("valid category rank regex")
});
static AGE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[-–]\s*(\d{1,2})\b").expect("valid age span regex")
});
static AGE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:\+|(?:&|and)\s*(?:over|up)\b)")
        .expect("valid open age regex")
});
static GENDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(men|male|boys|women|female|girls)\b").expect("valid gender regex")
});
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(masters|master|juniors|junior|elite|pro|collegiate|u23|singlespeed|open)\b")
        .expect("valid category type regex")
});

/// Arguments of an inline handler call like `fn(1234, 'Label')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCall {
    pub id: String,
    pub label: Option<String>,
}

/// Parse a call to `handler` that opens the attribute, e.g.
/// `loadInfoID(1234, 'Road 05/10/2021')`. Calls to other functions later
/// in the attribute are ignored.
pub fn parse_handler_call(attr: &str, handler: &str) -> Option<ScriptCall> {
    let args = attr.trim_start().strip_prefix(handler)?;
    script_call(&HANDLER_ARGS_RE.captures(args)?)
}

fn script_call(caps: &Captures) -> Option<ScriptCall> {
    let id = caps.get(1)?.as_str().to_string();
    let label = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim().to_string());

    Some(ScriptCall { id, label })
}

/// Race id from a `race_NUMBER` token anywhere in the text.
pub fn extract_race_id(text: &str) -> Option<String> {
    RACE_ID_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Display name with any trailing `MM/DD/YYYY` removed.
pub fn strip_trailing_date(text: &str) -> String {
    let text = super::normalize_whitespace(text);
    TRAILING_DATE_RE.replace(&text, "").into_owned()
}

/// Attributes implied by a category display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTraits {
    pub gender: Option<String>,
    pub category_type: Option<String>,
    pub age_range: Option<String>,
    pub category_rank: Option<String>,
}

/// Derive gender, type, age range and rank from a category name,
/// e.g. `Masters Men 35+ Cat 1/2`.
pub fn category_traits(name: &str) -> CategoryTraits {
    let category_rank = RANK_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<String>());

    // Ranks like "Cat 1-3" would otherwise read as ages.
    let without_rank = RANK_RE.replace_all(name, " ");

    let age_range = AGE_SPAN_RE
        .captures(&without_rank)
        .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
        .or_else(|| {
            AGE_OPEN_RE
                .captures(&without_rank)
                .map(|caps| format!("{}+", &caps[1]))
        });

    let gender = GENDER_RE.captures(name).map(|caps| {
        match caps[1].to_lowercase().as_str() {
            "women" | "female" | "girls" => "Women",
            _ => "Men",
        }
        .to_string()
    });

    let category_type = TYPE_RE.captures(name).map(|caps| {
        match caps[1].to_lowercase().as_str() {
            "masters" | "master" => "Masters",
            "juniors" | "junior" => "Junior",
            "elite" => "Elite",
            "pro" => "Pro",
            "collegiate" => "Collegiate",
            "u23" => "U23",
            "singlespeed" => "Singlespeed",
            _ => "Open",
        }
        .to_string()
    });

    CategoryTraits {
        gender,
        category_type,
        age_range,
        category_rank,
    }
}
