#![allow(dead_code)]

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use market_calendar::{
    error::CalendarResult,
    event::RawEvent,
    source::{
        EventSource, calendar::CalendarResponse, market_status::MarketStatusItem, sheet::SheetRow,
    },
};

pub const YEAR: i32 = 2025;

pub fn cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 26).expect("valid cutoff")
}

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

pub fn read_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|e| panic!("failed to read fixture {relative}: {e}"))
}

pub fn sheet_rows() -> Vec<SheetRow> {
    serde_json::from_str(&read_fixture("input/sheet.json")).expect("sheet fixture should parse")
}

pub fn calendar_response() -> CalendarResponse {
    serde_json::from_str(&read_fixture("input/calendar.json"))
        .expect("calendar fixture should parse")
}

pub fn market_status_items() -> Vec<MarketStatusItem> {
    serde_json::from_str(&read_fixture("input/market_status.json"))
        .expect("market status fixture should parse")
}

/// Unique scratch directory per test, cleared on creation.
pub fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "market-calendar-it-{test_name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

/// Serves pre-parsed events, standing in for a network feed.
pub struct StaticSource {
    pub name: &'static str,
    pub events: CalendarResult<Vec<RawEvent>>,
}

impl StaticSource {
    pub fn boxed(
        name: &'static str,
        events: CalendarResult<Vec<RawEvent>>,
    ) -> Box<dyn EventSource> {
        Box::new(Self { name, events })
    }
}

#[async_trait]
impl EventSource for StaticSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>> {
        match &self.events {
            Ok(events) => Ok(events.clone()),
            Err(e) => Err(market_calendar::error::CalendarError::Data(
                market_calendar::error::DataError::NoEventsFound(e.to_string()),
            )),
        }
    }
}
