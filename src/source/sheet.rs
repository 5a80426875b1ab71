use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::Itertools;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{CalendarResult, DataError},
    event::{Category, RawEvent, is_upcoming, parse_event_date},
    source::{EventSource, HttpFetcher, Url, lenient_string, text},
};

pub const SOURCE_NAME: &str = "sheet";

/// One row of the spreadsheet-backed feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub early_close_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub extra_note: Option<String>,
}

/// Events maintained by hand in a spreadsheet, served as a JSON array of rows.
#[derive(Debug, Clone)]
pub struct SheetSource {
    http: HttpFetcher,
    endpoint: Url,
    year: i32,
    cutoff: NaiveDate,
}

impl SheetSource {
    pub fn new(http: HttpFetcher, endpoint: Url, year: i32, cutoff: NaiveDate) -> Self {
        Self {
            http,
            endpoint,
            year,
            cutoff,
        }
    }
}

#[async_trait]
impl EventSource for SheetSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>> {
        let year = self.year.to_string();
        let rows: Vec<SheetRow> = self
            .http
            .get_json(&self.endpoint, &[("year", year.as_str())])
            .await?;
        parse_sheet_rows(rows, self.cutoff)
    }
}

/// Normalizes spreadsheet rows into upcoming events.
///
/// Rows without a date are skipped. `details` is the note (or the capitalized
/// type when there is none), followed by the early close time and the extra
/// note when present, one per line.
pub fn parse_sheet_rows(rows: Vec<SheetRow>, cutoff: NaiveDate) -> CalendarResult<Vec<RawEvent>> {
    let mut events = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(raw_date) = row.date.as_deref().filter(|d| !d.is_empty()) else {
            debug!(source = SOURCE_NAME, "Skipping row without date");
            continue;
        };
        let date = parse_event_date(raw_date).ok_or_else(|| DataError::InvalidDate {
            source_name: SOURCE_NAME.to_string(),
            value: raw_date.to_string(),
        })?;
        if !is_upcoming(date, cutoff) {
            continue;
        }

        let tag = row.kind.as_deref().unwrap_or_default().to_lowercase();
        let note = text(&row.note);
        let headline = if note.is_empty() {
            capitalize(&tag)
        } else {
            note.to_string()
        };

        let early_close = row
            .early_close_time
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Close Time: {t}"));
        let extra = row
            .extra_note
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let details = std::iter::once(headline)
            .chain(early_close)
            .chain(extra)
            .join("\n");

        events.push(RawEvent::new(date, Category::from_tag(&tag), details));
    }

    Ok(events)
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
