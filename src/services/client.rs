// src/services/client.rs

//! Results client.
//!
//! Drives the fetcher and parsers for the public operations. Bad rows are
//! dropped with a warning; failures of a whole page are logged and
//! returned to the caller.

use std::collections::BTreeMap;

use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::{HttpFetcher, LoadInfo, PageFetcher, PageRequest};
use crate::models::{
    CompleteEventData, Config, Discipline, Event, EventDetails, Fields, RaceCategory, RaceEntry,
    RaceResult,
};
use crate::parsers::{
    EventDetailsParser, EventListParser, PageParser, RaceResultsParser, element_text,
    parse_selector,
};
use crate::services::TierOutcome;
use crate::services::strategies;
use crate::utils::date::today;
use crate::utils::extract::{DISCIPLINE_HANDLER, parse_handler_call, strip_trailing_date};
use crate::utils::keep_valid;

/// Client for the legacy USA Cycling results site.
pub struct UsaCyclingClient<F> {
    fetcher: F,
    event_list: EventListParser,
    event_details: EventDetailsParser,
    race_results: RaceResultsParser,
}

impl UsaCyclingClient<HttpFetcher> {
    /// Create a client that fetches over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.client.base_url)?;
        Ok(Self::new(HttpFetcher::new(config)?, base_url))
    }
}

impl<F: PageFetcher> UsaCyclingClient<F> {
    /// Create a client over any page source; `base_url` resolves event links.
    pub fn new(fetcher: F, base_url: Url) -> Self {
        Self {
            fetcher,
            event_list: EventListParser::new(base_url),
            event_details: EventDetailsParser::new(),
            race_results: RaceResultsParser::new(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Markup of a page, whether served as HTML or wrapped in JSON.
    pub(super) fn fetch_html(&self, request: &PageRequest) -> Result<String> {
        let payload = self.fetcher.fetch(request)?;
        payload
            .html()
            .map(str::to_string)
            .ok_or_else(|| AppError::parse(request.cache_key(), "response carries no markup"))
    }

    /// Single-row page: the first parsed row, or a parse error.
    fn first_row(rows: Vec<Fields>, context: &str) -> Result<Fields> {
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::parse(context, "page produced no data"))
    }

    /// Events for a two-letter state code and year.
    pub fn list_events(&self, state: &str, year: i32) -> Result<Vec<Event>> {
        if state.chars().count() != 2 {
            return Err(AppError::validation(format!(
                "state must be a two-letter code, got {state:?}"
            )));
        }

        let request = PageRequest::EventList {
            state: state.to_string(),
            year,
        };
        let rows = self
            .fetch_html(&request)
            .and_then(|html| self.event_list.parse(&html))
            .inspect_err(|e| log::error!("Error getting events for {} {}: {}", state, year, e))?;

        let today = today();
        let events = keep_valid(
            rows.iter()
                .map(|row| Event::from_fields(row, state, year, today)),
            "event",
        );
        log::info!("Found {} events for {} {}", events.len(), state, year);
        Ok(events)
    }

    /// Details from an event's permit page.
    pub fn get_event_details(&self, permit: &str) -> Result<EventDetails> {
        let fields = self
            .fetch_html(&PageRequest::Permit {
                permit: permit.to_string(),
            })
            .and_then(|html| self.event_details.parse(&html))
            .and_then(|rows| Self::first_row(rows, "event details"))
            .inspect_err(|e| log::error!("Error getting event details for {}: {}", permit, e))?;

        EventDetails::from_fields(&fields, permit).map_err(|e| AppError::validation(e.to_string()))
    }

    /// Disciplines linked from the permit page, in document order. Anchors
    /// whose handler has no numeric id are skipped.
    pub fn list_disciplines(&self, permit: &str) -> Result<Vec<Discipline>> {
        let html = self
            .fetch_html(&PageRequest::Permit {
                permit: permit.to_string(),
            })
            .inspect_err(|e| log::error!("Error getting disciplines for {}: {}", permit, e))?;

        let document = Html::parse_document(&html);
        let links = parse_selector(&format!(r#"a[onclick^="{DISCIPLINE_HANDLER}"]"#))?;

        let disciplines = document
            .select(&links)
            .filter_map(|link| {
                let call = parse_handler_call(link.value().attr("onclick")?, DISCIPLINE_HANDLER)?;
                let text = element_text(&link);
                // Without a label the discipline is listed but never queried.
                let label = call.label.unwrap_or_default();
                let name = match strip_trailing_date(&text) {
                    name if name.is_empty() => strip_trailing_date(&label),
                    name => name,
                };
                Some(Discipline {
                    id: call.id,
                    name,
                    label,
                })
            })
            .collect::<Vec<_>>();

        log::debug!("Permit {}: {} disciplines", permit, disciplines.len());
        Ok(disciplines)
    }

    /// Categories of one discipline.
    pub fn get_race_categories(&self, info_id: &str, label: &str) -> Result<Vec<RaceCategory>> {
        let request = PageRequest::LoadInfo {
            info_id: info_id.to_string(),
            label: label.to_string(),
        };
        let payload = self
            .fetcher
            .fetch(&request)
            .inspect_err(|e| log::error!("Error getting race categories for {}: {}", info_id, e))?;

        let rows = match payload.into_load_info() {
            LoadInfo::Markup(markup) => self
                .race_results
                .parse_categories(&markup, info_id, label)
                .inspect_err(|e| {
                    log::error!("Error parsing race categories for {}: {}", info_id, e)
                })?,
            LoadInfo::Structured(_) => {
                log::debug!("Discipline {} answered with structured categories", info_id);
                Vec::new()
            }
            LoadInfo::Empty => Vec::new(),
        };

        Ok(keep_valid(
            rows.iter().map(RaceCategory::from_fields),
            "race category",
        ))
    }

    /// Results of one race. `category_info` names the race when the page
    /// does not.
    pub fn get_race_results(
        &self,
        race_id: &str,
        category_info: Option<&RaceCategory>,
    ) -> Result<RaceResult> {
        let result = self
            .fetch_html(&PageRequest::RaceResults {
                race_id: race_id.to_string(),
            })
            .and_then(|html| self.race_results.parse(&html))
            .and_then(|rows| Self::first_row(rows, "race results"))
            .and_then(|fields| RaceResult::from_fields(&fields, race_id, category_info, today()))
            .inspect_err(|e| log::error!("Error getting race results for {}: {}", race_id, e))?;

        log::debug!("Race {}: {} riders", race_id, result.riders.len());
        Ok(result)
    }

    /// Races of an event, trying each enumeration tier until one finds
    /// something.
    ///
    /// Fails only when discipline listing fails, or when every fetch made
    /// by every tier failed and nothing was found.
    pub fn list_races(&self, permit: &str) -> Result<Vec<RaceEntry>> {
        let disciplines = self.list_disciplines(permit)?;

        let mut total = TierOutcome::default();
        for (tier, strategy) in strategies::chain::<F>() {
            let outcome = strategy(self, permit, &disciplines);
            if !outcome.entries.is_empty() {
                log::info!(
                    "Found {} races for {} via {}",
                    outcome.entries.len(),
                    permit,
                    tier
                );
                return Ok(outcome.entries);
            }
            log::debug!("No races for {} via {}", permit, tier);
            total.absorb(outcome);
        }

        if total.all_failed() {
            if let Some(error) = total.last_error {
                log::error!("Error getting races for permit {}: {}", permit, error);
                return Err(error);
            }
        }
        Ok(Vec::new())
    }

    /// Details, disciplines, categories and optionally results of an event.
    pub fn get_complete_event_data(
        &self,
        permit: &str,
        include_results: bool,
    ) -> Result<CompleteEventData> {
        let details = self.get_event_details(permit)?;
        let disciplines = self.list_disciplines(permit)?;

        let mut categories = Vec::new();
        for discipline in disciplines
            .iter()
            .filter(|d| !d.id.is_empty() && !d.label.is_empty())
        {
            match self.get_race_categories(&discipline.id, &discipline.label) {
                Ok(found) => categories.extend(found),
                Err(e) => log::warn!(
                    "Error getting categories for discipline {}: {}",
                    discipline.id,
                    e
                ),
            }
        }

        let mut results = BTreeMap::new();
        if include_results {
            if categories.is_empty() {
                log::info!("No categories for {}, enumerating races", permit);
                match self.list_races(permit) {
                    Ok(races) => {
                        for race in races {
                            self.collect_result(&mut results, &race.id, None);
                        }
                    }
                    Err(e) => log::warn!("Error listing races for {}: {}", permit, e),
                }
            } else {
                for category in &categories {
                    self.collect_result(&mut results, &category.id, Some(category));
                }
            }
        }

        log::info!(
            "Event {}: {} disciplines, {} categories, {} results",
            permit,
            disciplines.len(),
            categories.len(),
            results.len()
        );

        Ok(CompleteEventData {
            details,
            disciplines,
            categories,
            results,
        })
    }

    fn collect_result(
        &self,
        results: &mut BTreeMap<String, RaceResult>,
        race_id: &str,
        category: Option<&RaceCategory>,
    ) {
        if race_id.is_empty() || results.contains_key(race_id) {
            return;
        }
        match self.get_race_results(race_id, category) {
            Ok(result) => {
                results.insert(race_id.to_string(), result);
            }
            Err(e) => log::warn!("Error getting results for race {}: {}", race_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::utils::testing::{capture_logs, warnings_containing};
    use serde_json::json;

    const PERMIT: &str = "2020-26";

    const PERMIT_PAGE: &str = r#"
        <html><body><div id="pgcontent">
          <h3>Boulder Roubaix</h3>
          Boulder, CO<br>
          Permit #: 2020-26<br>
          04/05/2020<br>
          <ul>
            <li><a href='#' onclick="loadInfoID(1234, 'Road 04/05/2020')">Road 04/05/2020</a></li>
            <li><a href='#' onclick="loadInfoID(1235, 'Criterium 04/05/2020')">Criterium 04/05/2020</a></li>
            <li><a href='#' onclick="loadInfoID(pending)">Gravel</a></li>
          </ul>
        </div></body></html>"#;

    const ROAD_CATEGORIES: &str = r#"
        <ul>
          <li id="race_101"><a onclick="loadResults('race_101')">Men Cat 1/2</a></li>
          <li id="race_102"><a onclick="loadResults('race_102')">Women Open</a></li>
        </ul>"#;

    const CRIT_CATEGORIES: &str =
        r#"<ul><li id="race_201"><a onclick="loadResults('race_201')">Masters Men 40+</a></li></ul>"#;

    fn base() -> Url {
        Url::parse("https://legacy.usacycling.org/results/").unwrap()
    }

    fn permit_page() -> PageRequest {
        PageRequest::Permit {
            permit: PERMIT.into(),
        }
    }

    fn load_info(info_id: &str, label: &str) -> PageRequest {
        PageRequest::LoadInfo {
            info_id: info_id.into(),
            label: label.into(),
        }
    }

    fn race(race_id: &str) -> PageRequest {
        PageRequest::RaceResults {
            race_id: race_id.into(),
        }
    }

    fn result_page(category: &str) -> String {
        format!(
            r#"<h3>{category} 04/05/2020</h3>
            <table>
              <tr><th>Place</th><th>Name</th><th>Team</th></tr>
              <tr><td>1</td><td>First Rider</td><td>Team A</td></tr>
            </table>"#
        )
    }

    fn event_fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .html(permit_page(), PERMIT_PAGE)
            .json(
                load_info("1234", "Road 04/05/2020"),
                json!({ "error": null, "message": ROAD_CATEGORIES }),
            )
            .html(load_info("1235", "Criterium 04/05/2020"), CRIT_CATEGORIES)
            .html(race("101"), &result_page("Men Cat 1/2"))
            .html(race("102"), &result_page("Women Open"))
            .html(race("201"), &result_page("Masters Men 40+"))
    }

    fn is_results(request: &PageRequest) -> bool {
        matches!(request, PageRequest::RaceResults { .. })
    }

    #[test]
    fn list_events_rejects_bad_state_before_fetching() {
        let fetcher = StaticFetcher::new();
        let client = UsaCyclingClient::new(&fetcher, base());

        for state in ["", "C", "CAL"] {
            assert!(matches!(
                client.list_events(state, 2020),
                Err(AppError::Validation(_))
            ));
        }
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn list_events_drops_incomplete_rows() {
        let html = r#"
            <table>
              <tr><td>04/05/2020</td><td><a href="?permit=2020-26">Boulder Roubaix</a></td><td>Boulder, CO</td></tr>
              <tr><td>TBD</td><td><a href="?permit=2020-27"> </a></td><td>Lyons, CO</td></tr>
              <tr><td>05/01/2020</td><td><a href="?permit=2020-31">Koppenberg</a></td><td>Superior, CO</td></tr>
            </table>"#;
        let fetcher = StaticFetcher::new().html(
            PageRequest::EventList {
                state: "CO".into(),
                year: 2020,
            },
            html,
        );
        let client = UsaCyclingClient::new(&fetcher, base());

        let events = client.list_events("CO", 2020).unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2020-26", "2020-31"]);
        assert_eq!(events[0].state, "CO");
        assert_eq!(events[0].year, 2020);
    }

    #[test]
    fn list_events_propagates_fetch_failure() {
        let fetcher = StaticFetcher::new();
        let client = UsaCyclingClient::new(&fetcher, base());
        assert!(matches!(
            client.list_events("CO", 2020),
            Err(AppError::Network { .. })
        ));
    }

    #[test]
    fn event_details_from_permit_page() {
        let fetcher = event_fetcher();
        let client = UsaCyclingClient::new(&fetcher, base());

        let details = client.get_event_details(PERMIT).unwrap();
        assert_eq!(details.name, "Boulder Roubaix");
        assert_eq!(details.permit, PERMIT);
        assert_eq!(details.location.as_deref(), Some("Boulder, CO"));
    }

    #[test]
    fn list_disciplines_in_document_order() {
        let fetcher = event_fetcher();
        let client = UsaCyclingClient::new(&fetcher, base());

        let disciplines = client.list_disciplines(PERMIT).unwrap();
        assert_eq!(
            disciplines,
            vec![
                Discipline {
                    id: "1234".into(),
                    name: "Road".into(),
                    label: "Road 04/05/2020".into(),
                },
                Discipline {
                    id: "1235".into(),
                    name: "Criterium".into(),
                    label: "Criterium 04/05/2020".into(),
                },
            ]
        );
        assert_eq!(client.list_disciplines(PERMIT).unwrap(), disciplines);
    }

    #[test]
    fn race_categories_from_ajax_markup() {
        let fetcher = event_fetcher();
        let client = UsaCyclingClient::new(&fetcher, base());

        let categories = client
            .get_race_categories("1234", "Road 04/05/2020")
            .unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, "101");
        assert_eq!(categories[0].event_id, "1234");
        assert_eq!(categories[0].discipline.as_deref(), Some("Road"));
        assert_eq!(categories[1].gender.as_deref(), Some("Women"));
    }

    #[test]
    fn race_results_drop_malformed_riders() {
        let html = r#"
            <h3>Men Cat 4 04/05/2020</h3>
            <table>
              <tr><th>Place</th><th>Name</th><th>Points</th></tr>
              <tr><td>1</td><td>First Rider</td><td>10</td></tr>
              <tr><td>2</td><td></td><td>8</td></tr>
              <tr><td>3</td><td>Third Rider</td><td></td></tr>
            </table>"#;
        capture_logs();
        let fetcher = StaticFetcher::new().html(race("4321"), html);
        let client = UsaCyclingClient::new(&fetcher, base());

        let result = client.get_race_results("4321", None).unwrap();
        let names: Vec<_> = result.riders.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First Rider", "Third Rider"]);
        assert_eq!(warnings_containing("Skipping rider in race 4321"), 1);
        assert_eq!(result.id, "4321");
        assert_eq!(result.event_id, "4321");
        assert_eq!(result.category, "Men Cat 4");
        assert_eq!(result.date, chrono::NaiveDate::from_ymd_opt(2020, 4, 5).unwrap());
    }

    #[test]
    fn list_races_from_categories() {
        let fetcher = event_fetcher();
        let client = UsaCyclingClient::new(&fetcher, base());

        let races = client.list_races(PERMIT).unwrap();
        let ids: Vec<_> = races.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["101", "102", "201"]);
        assert_eq!(races[2].discipline_id, "1235");
        assert_eq!(races[2].discipline_name, "Criterium");
        assert_eq!(races[2].permit, PERMIT);
    }

    #[test]
    fn list_races_recovers_from_race_links() {
        let page = r#"
            <h3>Lyons Crit</h3>
            <a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road 04/05/2020</a>
            <a onclick="showResults(1234, 'race_555')">Men Open</a>
            <a onclick="showResults(9999, 'race_556')">Other event</a>"#;
        let fetcher = StaticFetcher::new()
            .html(permit_page(), page)
            .failing(load_info("1234", "Road 04/05/2020"));
        let client = UsaCyclingClient::new(&fetcher, base());

        let races = client.list_races(PERMIT).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].id, "555");
        assert_eq!(races[0].name, "Men Open");
        assert_eq!(races[0].discipline_name, "Road");
    }

    #[test]
    fn list_races_falls_back_to_structured_load_info() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road 04/05/2020</a>"#;
        let fetcher = StaticFetcher::new().html(permit_page(), page).json(
            load_info("1234", "Road 04/05/2020"),
            json!({ "categories": [
                { "id": "301", "name": "Men A" },
                { "id": 302, "name": "Women A" },
                { "name": "No id" },
            ] }),
        );
        let client = UsaCyclingClient::new(&fetcher, base());

        let races = client.list_races(PERMIT).unwrap();
        assert_eq!(races.len(), 2);
        assert_eq!(races[0].id, "301");
        assert_eq!(races[1].id, "302");
        assert_eq!(races[1].name, "Women A");
        assert!(races.iter().all(|r| r.discipline_id == "1234" && r.discipline_name == "Road"));
    }

    #[test]
    fn list_races_empty_when_nothing_is_found() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road</a>"#;
        let fetcher = StaticFetcher::new()
            .html(permit_page(), page)
            .html(load_info("1234", "Road 04/05/2020"), "<p>No results</p>");
        let client = UsaCyclingClient::new(&fetcher, base());

        assert!(client.list_races(PERMIT).unwrap().is_empty());
    }

    #[test]
    fn list_races_fails_when_every_fetch_fails() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road</a>"#;
        let fetcher = StaticFetcher::new()
            .html(permit_page(), page)
            .then_failing(permit_page())
            .failing(load_info("1234", "Road 04/05/2020"));
        let client = UsaCyclingClient::new(&fetcher, base());

        assert!(matches!(
            client.list_races(PERMIT),
            Err(AppError::Network { status: Some(503), .. })
        ));
        assert_eq!(fetcher.count(|r| *r == permit_page()), 2);
        assert_eq!(
            fetcher.count(|r| matches!(r, PageRequest::LoadInfo { .. })),
            2
        );
    }

    #[test]
    fn list_races_partial_failure_is_empty_not_an_error() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road</a>"#;
        let fetcher = StaticFetcher::new()
            .html(permit_page(), page)
            .failing(load_info("1234", "Road 04/05/2020"));
        let client = UsaCyclingClient::new(&fetcher, base());

        assert_eq!(client.list_races(PERMIT).unwrap(), Vec::new());
    }

    #[test]
    fn list_disciplines_only_reads_the_discipline_handler() {
        let page = r#"
            <a onclick="loadInfoID(pending); trackClick(42, 'Road 04/05/2020')">Gravel</a>
            <a onclick="loadInfoID(77)">Time Trial 04/06/2020</a>"#;
        let fetcher = StaticFetcher::new().html(permit_page(), page);
        let client = UsaCyclingClient::new(&fetcher, base());

        assert_eq!(
            client.list_disciplines(PERMIT).unwrap(),
            vec![Discipline {
                id: "77".into(),
                name: "Time Trial".into(),
                label: String::new(),
            }]
        );
    }

    #[test]
    fn unlabelled_disciplines_are_never_queried() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(77)">Time Trial</a>"#;
        let fetcher = StaticFetcher::new().html(permit_page(), page);
        let client = UsaCyclingClient::new(&fetcher, base());

        assert!(client.list_races(PERMIT).unwrap().is_empty());
        assert_eq!(
            fetcher.count(|r| matches!(r, PageRequest::LoadInfo { .. })),
            0
        );
    }

    #[test]
    fn list_races_propagates_discipline_failure() {
        let fetcher = StaticFetcher::new().failing(permit_page());
        let client = UsaCyclingClient::new(&fetcher, base());
        assert!(client.list_races(PERMIT).is_err());
    }

    #[test]
    fn complete_event_without_results_fetches_no_result_pages() {
        let fetcher = event_fetcher();
        let client = UsaCyclingClient::new(&fetcher, base());

        let data = client.get_complete_event_data(PERMIT, false).unwrap();
        assert_eq!(data.details.name, "Boulder Roubaix");
        assert_eq!(data.disciplines.len(), 2);
        assert_eq!(data.categories.len(), 3);
        assert!(data.results.is_empty());
        assert_eq!(fetcher.count(is_results), 0);
    }

    #[test]
    fn complete_event_with_results_keys_by_race_id() {
        let fetcher = event_fetcher().failing(race("102"));
        let client = UsaCyclingClient::new(&fetcher, base());

        let data = client.get_complete_event_data(PERMIT, true).unwrap();
        let keys: Vec<_> = data.results.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["101", "201"]);
        assert_eq!(data.results["201"].category, "Masters Men 40+");
        assert_eq!(fetcher.count(is_results), 3);
    }

    #[test]
    fn complete_event_without_categories_enumerates_races() {
        let page = r#"<h3>Gila</h3><a onclick="loadInfoID(1234, 'Road 04/05/2020')">Road</a>"#;
        let fetcher = StaticFetcher::new()
            .html(permit_page(), page)
            .json(
                load_info("1234", "Road 04/05/2020"),
                json!({ "categories": [{ "id": "301", "name": "Men A" }] }),
            )
            .html(race("301"), &result_page("Men A"));
        let client = UsaCyclingClient::new(&fetcher, base());

        let data = client.get_complete_event_data(PERMIT, true).unwrap();
        assert!(data.categories.is_empty());
        assert_eq!(data.results["301"].riders.len(), 1);
    }

    #[test]
    fn complete_event_propagates_details_failure() {
        let fetcher = StaticFetcher::new();
        let client = UsaCyclingClient::new(&fetcher, base());
        assert!(client.get_complete_event_data(PERMIT, false).is_err());
    }
}
