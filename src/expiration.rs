use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::{
    error::CalendarResult,
    event::{Category, RawEvent, is_upcoming},
    source::EventSource,
};

pub const SOURCE_NAME: &str = "expirations";

const QUARTER_END_MONTHS: [u32; 4] = [3, 6, 9, 12];

/// Third Friday of the month, the standard monthly option expiration.
///
/// Returns `None` only for months chrono cannot represent.
pub fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(year, month, 1)?;
    while day.weekday() != Weekday::Fri {
        day = day.succ_opt()?;
    }

    let third = day.checked_add_days(Days::new(14))?;
    if third.month() != month {
        return third.checked_sub_days(Days::new(7));
    }
    Some(third)
}

/// One expiration per month of `year`, skipping those on or before `cutoff`.
///
/// ```
/// # use chrono::NaiveDate;
/// # use market_calendar::prelude::*;
/// let cutoff = NaiveDate::from_ymd_opt(2025, 8, 26).unwrap();
/// let events = monthly_expirations(2025, cutoff);
/// assert_eq!(events.len(), 4);
/// assert_eq!(events[0].category, Category::Qexpire);
/// ```
pub fn monthly_expirations(year: i32, cutoff: NaiveDate) -> Vec<RawEvent> {
    (1..=12)
        .filter_map(|month| third_friday(year, month).map(|date| (month, date)))
        .filter(|(_, date)| is_upcoming(*date, cutoff))
        .map(|(month, date)| {
            if QUARTER_END_MONTHS.contains(&month) {
                RawEvent::new(date, Category::Qexpire, "Quarterly Expiration")
            } else {
                RawEvent::new(date, Category::Expire, "Monthly Expiration")
            }
        })
        .collect()
}

/// Computed expirations exposed as an [`EventSource`]. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct ExpirationRule {
    year: i32,
    cutoff: NaiveDate,
}

impl ExpirationRule {
    pub fn new(year: i32, cutoff: NaiveDate) -> Self {
        Self { year, cutoff }
    }
}

#[async_trait]
impl EventSource for ExpirationRule {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>> {
        Ok(monthly_expirations(self.year, self.cutoff))
    }
}
