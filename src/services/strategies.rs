// src/services/strategies.rs

//! Race enumeration tiers.
//!
//! Each tier maps `(permit, disciplines)` to a [`TierOutcome`]. The client
//! runs them in order and keeps the first non-empty list.

use std::collections::HashSet;

use scraper::Html;

use crate::error::{AppError, Result};
use crate::fetch::{LoadInfo, PageFetcher, PageRequest};
use crate::models::{Discipline, FieldsExt, RaceEntry};
use crate::parsers::{element_text, parse_selector};
use crate::services::UsaCyclingClient;
use crate::utils::extract::extract_race_id;

/// One enumeration tier.
pub(crate) type Strategy<F> = fn(&UsaCyclingClient<F>, &str, &[Discipline]) -> TierOutcome;

/// Tiers in the order they are tried.
pub(crate) fn chain<F: PageFetcher>() -> [(&'static str, Strategy<F>); 2] {
    [("categories", by_category::<F>), ("load-info", by_load_info::<F>)]
}

/// Entries found by a tier plus its fetch bookkeeping.
#[derive(Debug, Default)]
pub struct TierOutcome {
    pub entries: Vec<RaceEntry>,
    pub attempted: usize,
    pub failed: usize,
    pub last_error: Option<AppError>,
}

impl TierOutcome {
    fn record<T>(&mut self, result: Result<T>, context: &str) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{}: {}", context, e);
                self.failed += 1;
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Fold another tier's bookkeeping into this one.
    pub fn absorb(&mut self, other: TierOutcome) {
        self.entries.extend(other.entries);
        self.attempted += other.attempted;
        self.failed += other.failed;
        if other.last_error.is_some() {
            self.last_error = other.last_error;
        }
    }

    /// True when fetches were made and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

fn usable(disciplines: &[Discipline]) -> impl Iterator<Item = &Discipline> {
    disciplines
        .iter()
        .filter(|d| !d.id.is_empty() && !d.label.is_empty())
}

/// Categories of every discipline. A discipline whose category lookup
/// fails is recovered by scraping race links from the permit page.
fn by_category<F: PageFetcher>(
    client: &UsaCyclingClient<F>,
    permit: &str,
    disciplines: &[Discipline],
) -> TierOutcome {
    let mut outcome = TierOutcome::default();

    for discipline in usable(disciplines) {
        let categories = outcome.record(
            client.get_race_categories(&discipline.id, &discipline.label),
            &format!("Error getting categories for discipline {}", discipline.id),
        );

        match categories {
            Some(categories) => outcome.entries.extend(
                categories
                    .into_iter()
                    .filter(|c| !c.id.is_empty())
                    .map(|c| RaceEntry::new(c.id, discipline, c.name, permit)),
            ),
            None => {
                if let Some(entries) = outcome.record(
                    scrape_race_links(client, permit, discipline),
                    &format!("Error finding race links for discipline {}", discipline.id),
                ) {
                    outcome.entries.extend(entries);
                }
            }
        }
    }

    outcome
}

/// Anchors on the permit page whose `onclick` mentions the discipline id
/// and carries a `race_NUMBER` token.
fn scrape_race_links<F: PageFetcher>(
    client: &UsaCyclingClient<F>,
    permit: &str,
    discipline: &Discipline,
) -> Result<Vec<RaceEntry>> {
    let html = client.fetch_html(&PageRequest::Permit {
        permit: permit.to_string(),
    })?;
    let document = Html::parse_document(&html);
    let anchors = parse_selector("a[onclick]")?;

    let mut seen = HashSet::new();
    let entries = document
        .select(&anchors)
        .filter_map(|anchor| {
            let onclick = anchor.value().attr("onclick")?;
            if !onclick.contains(discipline.id.as_str()) {
                return None;
            }
            let race_id = extract_race_id(onclick)?;
            seen.insert(race_id.clone())
                .then(|| RaceEntry::new(race_id, discipline, element_text(&anchor), permit))
        })
        .collect();

    Ok(entries)
}

/// Structured load-info payloads, for sites that answer with a
/// `categories` array instead of markup.
fn by_load_info<F: PageFetcher>(
    client: &UsaCyclingClient<F>,
    permit: &str,
    disciplines: &[Discipline],
) -> TierOutcome {
    let mut outcome = TierOutcome::default();

    for discipline in usable(disciplines) {
        let request = PageRequest::LoadInfo {
            info_id: discipline.id.clone(),
            label: discipline.label.clone(),
        };
        let Some(payload) = outcome.record(
            client.fetcher().fetch(&request),
            &format!("Error directly fetching info for discipline {}", discipline.id),
        ) else {
            continue;
        };

        if let LoadInfo::Structured(categories) = payload.into_load_info() {
            outcome.entries.extend(categories.iter().filter_map(|category| {
                let id = category.text("id")?;
                let name = category.text("name").unwrap_or_default();
                Some(RaceEntry::new(id, discipline, name, permit))
            }));
        }
    }

    outcome
}
