use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::{impl_from_primitive, impl_from_str_ref};

// ================================================================================================
// Category
// ================================================================================================

/// Classification of a calendar event.
///
/// The five known categories drive the encoding. Tags that none of the feeds
/// are expected to emit are kept verbatim in [`Category::Unrecognized`] so they
/// still take part in deduplication and encode to `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    /// Full market closure.
    Holiday,
    /// Shortened trading session.
    Early,
    /// Monthly option/futures expiration.
    Expire,
    /// Quarter-end expiration.
    Qexpire,
    /// User-defined event.
    User,
    #[strum(default)]
    Unrecognized(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::Holiday,
        Category::Early,
        Category::Expire,
        Category::Qexpire,
        Category::User,
    ];

    /// Parses a feed tag. Never fails; unknown tags become [`Category::Unrecognized`].
    pub fn from_tag(tag: &str) -> Self {
        tag.parse()
            .unwrap_or_else(|_| Category::Unrecognized(tag.to_string()))
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Holiday => "holiday",
            Self::Early => "early",
            Self::Expire => "expire",
            Self::Qexpire => "qexpire",
            Self::User => "user",
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Integer code written into the `low` column; `0` for unrecognized tags.
    pub fn type_code(&self) -> u32 {
        match self {
            Self::Holiday => 1,
            Self::Early => 2,
            Self::Expire => 3,
            Self::Qexpire => 4,
            Self::User => 5,
            Self::Unrecognized(_) => 0,
        }
    }

    pub fn from_type_code(code: u32) -> Option<Self> {
        Self::KNOWN.into_iter().find(|c| c.type_code() == code)
    }

    /// Display color used by the charting front-end.
    pub fn default_color(&self) -> Option<Color> {
        let hex = match self {
            Self::Holiday => "#ffd700",
            Self::Early => "#ffa500",
            Self::Expire => "#ff4d4f",
            Self::Qexpire => "#ff85c0",
            Self::User => "#8a2be2",
            Self::Unrecognized(_) => return None,
        };
        Some(Color::from(hex))
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Holiday => "Holiday",
            Self::Early => "Early Close",
            Self::Expire => "Monthly Expiration",
            Self::Qexpire => "Quarterly Expiration",
            Self::User => "User Event",
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A hex color string such as `#ffd700`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color(pub String);
impl_from_primitive!(Color, String);
impl_from_str_ref!(Color);

// ================================================================================================
// Events
// ================================================================================================

/// An event as produced by a single source, before sanitization and merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub date: NaiveDate,
    pub category: Category,
    pub details: String,
}

impl RawEvent {
    pub fn new(date: NaiveDate, category: Category, details: impl Into<String>) -> Self {
        Self {
            date,
            category,
            details: details.into(),
        }
    }
}

/// A sanitized, deduplicated event. Unique by its [`DedupKey`] within a merged set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub date: NaiveDate,
    pub category: Category,
    pub details: String,
}

impl CanonicalEvent {
    pub fn dedup_key(&self) -> DedupKey<'_> {
        DedupKey {
            date: self.date,
            category: &self.category,
            details: &self.details,
        }
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

impl From<RawEvent> for CanonicalEvent {
    fn from(raw: RawEvent) -> Self {
        Self {
            date: raw.date,
            details: sanitize_details(&raw.details),
            category: raw.category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey<'a> {
    pub date: NaiveDate,
    pub category: &'a Category,
    pub details: &'a str,
}

// ================================================================================================
// Helpers
// ================================================================================================

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source annotations stripped from `details` before comparison.
const ANNOTATION_NOISE: [&str; 4] = ["[Market] ", " (closed)", " (early-close)", "[polygon] "];

/// Removes feed-specific annotations and surrounding whitespace.
///
/// ```
/// # use market_calendar::prelude::*;
/// assert_eq!(sanitize_details("[Market] Thanksgiving (closed)"), "Thanksgiving");
/// ```
pub fn sanitize_details(details: &str) -> String {
    ANNOTATION_NOISE
        .iter()
        .fold(details.to_string(), |acc, noise| acc.replace(noise, ""))
        .trim()
        .to_string()
}

/// Date-only layouts seen in feed exports, tried in order.
const DATE_LAYOUTS: [&str; 2] = [DATE_FORMAT, "%m/%d/%Y"];

/// Naive date-time layouts; `%.f` also matches a missing fraction.
const DATE_TIME_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Extracts the calendar date from a feed value.
///
/// Accepts plain dates (`2025-09-01`, `09/01/2025`), RFC 3339 date-times (the
/// date is taken in the value's own offset) and naive date-times separated by
/// `T` or a space, with optional fractional seconds.
pub fn parse_event_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            DATE_TIME_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
                .map(|dt| dt.date())
        })
}

/// Future-only filter: strictly after the cutoff.
pub fn is_upcoming(date: NaiveDate, cutoff: NaiveDate) -> bool {
    date > cutoff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_sanitize_details() {
        assert_eq!(
            sanitize_details("[Market] Thanksgiving (closed)"),
            "Thanksgiving"
        );
        assert_eq!(sanitize_details(" Already Clean "), "Already Clean");
        assert_eq!(
            sanitize_details("[polygon] Christmas Eve (early-close)"),
            "Christmas Eve"
        );
        // Only the exact annotations are removed
        assert_eq!(sanitize_details("Market Closed"), "Market Closed");
        assert_eq!(
            sanitize_details("Labor Day\nClose Time: 1pm "),
            "Labor Day\nClose Time: 1pm"
        );
    }

    #[test]
    fn test_category_from_tag() {
        assert_eq!(Category::from_tag("holiday"), Category::Holiday);
        assert_eq!(Category::from_tag("QExpire"), Category::Qexpire);
        assert_eq!(
            Category::from_tag("dividend"),
            Category::Unrecognized("dividend".to_string())
        );
        assert_eq!(Category::from_tag("").type_code(), 0);
    }

    #[test]
    fn test_category_display_name() {
        assert_eq!(Category::Early.display_name(), "Early Close");
        assert_eq!(Category::Qexpire.display_name(), "Quarterly Expiration");
        assert_eq!(Category::User.display_name(), "User Event");
        assert_eq!(Category::from_tag("Dividend").display_name(), "Dividend");
    }

    #[test]
    fn test_category_codes_round_trip() {
        for category in Category::KNOWN {
            assert_eq!(
                Category::from_type_code(category.type_code()),
                Some(category.clone())
            );
            assert!(category.default_color().is_some());
        }
        assert_eq!(Category::from_type_code(0), None);
        assert_eq!(Category::from_type_code(6), None);
    }

    #[test]
    fn test_parse_event_date() {
        assert_eq!(parse_event_date("2025-09-01"), Some(date(2025, 9, 1)));
        assert_eq!(
            parse_event_date("2025-11-28T10:00:00-07:00"),
            Some(date(2025, 11, 28))
        );
        // Late evening in a negative offset stays on the local calendar day
        assert_eq!(
            parse_event_date("2025-12-24T23:30:00-07:00"),
            Some(date(2025, 12, 24))
        );
        assert_eq!(
            parse_event_date("2025-07-03T13:00:00"),
            Some(date(2025, 7, 3))
        );
        assert_eq!(parse_event_date("next tuesday"), None);
        assert_eq!(parse_event_date(""), None);
    }

    #[test]
    fn test_parse_event_date_export_layouts() {
        let labor_day = Some(date(2025, 9, 1));
        assert_eq!(parse_event_date("2025-09-01 00:00:00"), labor_day);
        assert_eq!(parse_event_date("2025-09-01T13:00:00.000"), labor_day);
        assert_eq!(parse_event_date("2025-09-01 13:00:00.250"), labor_day);
        assert_eq!(parse_event_date("09/01/2025"), labor_day);
        assert_eq!(parse_event_date(" 9/1/2025 "), labor_day);
        assert_eq!(parse_event_date("2025-13-01 00:00:00"), None);
        assert_eq!(parse_event_date("31/12/2025"), None);
    }

    #[test]
    fn test_is_upcoming_excludes_cutoff() {
        let cutoff = date(2025, 8, 26);
        assert!(!is_upcoming(date(2025, 8, 25), cutoff));
        assert!(!is_upcoming(cutoff, cutoff));
        assert!(is_upcoming(date(2025, 8, 27), cutoff));
    }

    #[test]
    fn test_canonical_from_raw_sanitizes() {
        let raw = RawEvent::new(
            date(2025, 11, 27),
            Category::Holiday,
            "[Market] Thanksgiving (closed)",
        );
        let canonical = CanonicalEvent::from(raw);
        assert_eq!(canonical.details, "Thanksgiving");
        assert_eq!(canonical.date_string(), "2025-11-27");
    }
}
