use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{CalendarResult, ConfigError},
    event::{Category, RawEvent, is_upcoming, parse_event_date},
    source::{ApiKey, EventSource, HttpFetcher, Url, text},
};

pub const SOURCE_NAME: &str = "market_status";

/// One upcoming exchange session change.
///
/// The feed lists the same holiday once per exchange, which is why
/// [`parse_market_status`] deduplicates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketStatusItem {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Upcoming market holidays and early closes from the exchange status feed.
#[derive(Debug, Clone)]
pub struct MarketStatusSource {
    http: HttpFetcher,
    endpoint: Url,
    api_key: Option<ApiKey>,
    year: i32,
    cutoff: NaiveDate,
}

impl MarketStatusSource {
    pub fn new(
        http: HttpFetcher,
        endpoint: Url,
        api_key: Option<ApiKey>,
        year: i32,
        cutoff: NaiveDate,
    ) -> Self {
        Self {
            http,
            endpoint,
            api_key,
            year,
            cutoff,
        }
    }
}

#[async_trait]
impl EventSource for MarketStatusSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingApiKey(SOURCE_NAME.to_string()))?;

        let items: Vec<MarketStatusItem> = self
            .http
            .get_json(&self.endpoint, &[("apiKey", api_key.as_ref())])
            .await?;
        parse_market_status(items, self.year, self.cutoff)
    }
}

/// Normalizes status items into upcoming events of the target year.
///
/// Items without a readable date are skipped, the feed uses placeholders for
/// sessions that are not scheduled yet. Items are deduplicated on
/// `(date, category, name)`, first occurrence wins.
pub fn parse_market_status(
    items: Vec<MarketStatusItem>,
    year: i32,
    cutoff: NaiveDate,
) -> CalendarResult<Vec<RawEvent>> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for item in items {
        let Some(raw_date) = item.date.as_deref().filter(|d| !d.is_empty()) else {
            debug!(source = SOURCE_NAME, "Skipping item without date");
            continue;
        };
        let Some(date) = parse_event_date(raw_date) else {
            debug!(
                source = SOURCE_NAME,
                value = raw_date,
                "Skipping item with unreadable date"
            );
            continue;
        };
        if date.year() != year || !is_upcoming(date, cutoff) {
            continue;
        }

        let name = text(&item.name).to_string();
        let category = classify(text(&item.status));

        if !seen.insert((date, category.clone(), name.clone())) {
            continue;
        }
        events.push(RawEvent::new(date, category, name));
    }

    Ok(events)
}

/// Any status mentioning "early" is an early close, everything else a closure.
pub fn classify(status: &str) -> Category {
    if status.to_lowercase().contains("early") {
        Category::Early
    } else {
        Category::Holiday
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 26).unwrap()
    }

    fn items(json: &str) -> Vec<MarketStatusItem> {
        serde_json::from_str(json).expect("fixture should deserialize")
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("early-close"), Category::Early);
        assert_eq!(classify("EARLY-CLOSE"), Category::Early);
        assert_eq!(classify("closed"), Category::Holiday);
        assert_eq!(classify(""), Category::Holiday);
    }

    #[test]
    fn test_duplicates_across_exchanges_collapse() {
        let events = parse_market_status(
            items(
                r#"[
                    {"date": "2025-11-27", "exchange": "NYSE", "name": "Thanksgiving", "status": "closed"},
                    {"date": "2025-11-27", "exchange": "NASDAQ", "name": "Thanksgiving", "status": "closed"},
                    {"date": "2025-11-28", "exchange": "NYSE", "name": "Thanksgiving", "status": "early-close"},
                    {"date": "2025-11-28", "exchange": "NASDAQ", "name": " Thanksgiving ", "status": "early-close"}
                ]"#,
            ),
            2025,
            cutoff(),
        )
        .expect("items should parse");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, Category::Holiday);
        assert_eq!(events[1].category, Category::Early);
        assert!(events.iter().all(|e| e.details == "Thanksgiving"));
    }

    #[test]
    fn test_other_years_past_dates_and_missing_dates_are_dropped() {
        let events = parse_market_status(
            items(
                r#"[
                    {"name": "No date", "status": "closed"},
                    {"date": "2026-01-01", "name": "New Years Day", "status": "closed"},
                    {"date": "2025-07-04", "name": "Independence Day", "status": "closed"},
                    {"date": "2025-12-25", "name": "Christmas", "status": "closed"}
                ]"#,
            ),
            2025,
            cutoff(),
        )
        .expect("items should parse");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details, "Christmas");
    }

    #[test]
    fn test_unreadable_dates_do_not_drop_the_feed() {
        let events = parse_market_status(
            items(
                r#"[
                    {"date": "TBD", "name": "Juneteenth", "status": "closed"},
                    {"date": "2025-12-25", "name": "Christmas", "status": "closed"}
                ]"#,
            ),
            2025,
            cutoff(),
        )
        .expect("placeholder dates are skipped");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
        assert_eq!(events[0].details, "Christmas");
    }

    #[test]
    fn test_year_is_compared_on_the_parsed_date() {
        // A 2026 entry whose name mentions 2025 must not pass the year filter
        let events = parse_market_status(
            items(r#"[{"date": "2026-01-01", "name": "Close of 2025", "status": "closed"}]"#),
            2025,
            cutoff(),
        )
        .expect("items should parse");
        assert!(events.is_empty());
    }
}
