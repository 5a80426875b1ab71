use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{CalendarResult, ConfigError, DataError},
    event::{Category, RawEvent, is_upcoming, parse_event_date},
    source::{ApiKey, EventSource, HttpFetcher, Url, text},
};

pub const SOURCE_NAME: &str = "calendar";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarResponse {
    #[serde(default)]
    pub items: Vec<CalendarItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarItem {
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// All-day events carry `date`, timed events carry `dateTime`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTime {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "dateTime")]
    pub date_time: Option<String>,
}

impl EventTime {
    fn value(&self) -> Option<&str> {
        self.date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.date_time.as_deref().filter(|d| !d.is_empty()))
    }
}

/// A shared calendar holding market closures, early closes and user events.
#[derive(Debug, Clone)]
pub struct CalendarSource {
    http: HttpFetcher,
    endpoint: Url,
    api_key: Option<ApiKey>,
    year: i32,
    cutoff: NaiveDate,
}

impl CalendarSource {
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
impl EventSource for CalendarSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingApiKey(SOURCE_NAME.to_string()))?;

        let time_min = format!("{}-01-01T00:00:00Z", self.year);
        let time_max = format!("{}-12-31T23:59:59Z", self.year);
        let query = [
            ("key", api_key.as_ref()),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
        ];

        let response: CalendarResponse = self.http.get_json(&self.endpoint, &query).await?;
        parse_calendar_items(response.items, self.cutoff)
    }
}

/// Normalizes calendar items into upcoming events.
///
/// Multi-day items are represented by their start date.
pub fn parse_calendar_items(
    items: Vec<CalendarItem>,
    cutoff: NaiveDate,
) -> CalendarResult<Vec<RawEvent>> {
    let mut events = Vec::with_capacity(items.len());

    for item in items {
        let Some(raw_start) = item.start.as_ref().and_then(EventTime::value) else {
            debug!(source = SOURCE_NAME, "Skipping item without start");
            continue;
        };
        let start = parse_date(raw_start)?;
        if !is_upcoming(start, cutoff) {
            continue;
        }
        // Validated even though only the start day is emitted.
        if let Some(raw_end) = item.end.as_ref().and_then(|e| e.date.as_deref()) {
            parse_date(raw_end)?;
        }

        let summary = text(&item.summary);
        let description = text(&item.description);
        let details = if description.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{description}")
        };

        events.push(RawEvent::new(start, classify(summary), details));
    }

    Ok(events)
}

/// `user` wins over `closed`; anything else is an early close.
///
/// The `closed` match is case-sensitive, so "Market Closed" is an early close.
pub fn classify(summary: &str) -> Category {
    if summary.to_lowercase().contains("user") {
        Category::User
    } else if summary.contains("closed") {
        Category::Holiday
    } else {
        Category::Early
    }
}

fn parse_date(value: &str) -> CalendarResult<NaiveDate> {
    parse_event_date(value).ok_or_else(|| {
        DataError::InvalidDate {
            source_name: SOURCE_NAME.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}
