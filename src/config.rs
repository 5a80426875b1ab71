use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::{
    error::{CalendarResult, ConfigError},
    event::DATE_FORMAT,
    source::{ApiKey, Url},
};

pub const DEFAULT_SHEET_URL: &str = "https://script.google.com/macros/s/AKfycbzcqHOQUDSFqSmQ2vRA44DRS2DostY9shUyEZLFRy1F3WkBCSiK5PlNNwUmOA5U7hrlaQ/exec";
pub const DEFAULT_CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/a6593804dfea896d39158db12ee0af1f88cc01644db51df4c12ba3c9abdbd370@group.calendar.google.com/events";
pub const DEFAULT_MARKET_STATUS_URL: &str = "https://api.polygon.io/v1/marketstatus/upcoming";
pub const DEFAULT_OUTPUT: &str = "calendar_events.csv";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Phoenix;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable names read by [`CalendarConfig::from_env`].
pub mod env_keys {
    pub const CURRENT_DATE: &str = "CALENDAR_CURRENT_DATE";
    pub const TARGET_YEAR: &str = "CALENDAR_TARGET_YEAR";
    pub const TIMEZONE: &str = "CALENDAR_TZ";
    pub const SHEET_URL: &str = "CALENDAR_SHEET_URL";
    pub const CALENDAR_URL: &str = "CALENDAR_GCAL_URL";
    pub const MARKET_STATUS_URL: &str = "CALENDAR_MARKET_STATUS_URL";
    pub const CALENDAR_API_KEY: &str = "GCAL_API_KEY";
    pub const MARKET_STATUS_API_KEY: &str = "POLYGON_API_KEY";
    pub const HTTP_TIMEOUT: &str = "CALENDAR_HTTP_TIMEOUT";
    pub const OUTPUT: &str = "CALENDAR_OUTPUT";
    pub const NAME_TABLE: &str = "CALENDAR_NAME_TABLE";
}

/// Parameters of a single aggregation run.
///
/// Only events strictly after `current_date` are kept, and the expiration
/// rule and year-scoped feeds operate on `target_year`.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub current_date: NaiveDate,
    pub target_year: i32,
    pub timezone: Tz,
    pub sheet_endpoint: Url,
    pub calendar_endpoint: Url,
    pub market_status_endpoint: Url,
    pub calendar_api_key: Option<ApiKey>,
    pub market_status_api_key: Option<ApiKey>,
    pub http_timeout: Duration,
    pub output_path: PathBuf,
    /// Optional JSON file extending the name → id encoding table.
    pub name_table_path: Option<PathBuf>,
}

impl CalendarConfig {
    /// Builds a configuration for the given cutoff, with the target year taken from it.
    pub fn new(current_date: NaiveDate) -> Self {
        Self {
            current_date,
            target_year: current_date.year(),
            timezone: DEFAULT_TIMEZONE,
            sheet_endpoint: Url::from(DEFAULT_SHEET_URL),
            calendar_endpoint: Url::from(DEFAULT_CALENDAR_URL),
            market_status_endpoint: Url::from(DEFAULT_MARKET_STATUS_URL),
            calendar_api_key: None,
            market_status_api_key: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            name_table_path: None,
        }
    }

    /// Reads the configuration from process environment variables.
    pub fn from_env() -> CalendarResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> CalendarResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timezone = match get(env_keys::TIMEZONE) {
            Some(v) => parse_value::<Tz>(env_keys::TIMEZONE, &v)?,
            None => DEFAULT_TIMEZONE,
        };

        let current_date = match get(env_keys::CURRENT_DATE) {
            Some(v) => parse_date(env_keys::CURRENT_DATE, &v)?,
            None => today_in(timezone),
        };

        let mut cfg = Self::new(current_date).with_timezone(timezone);

        if let Some(v) = get(env_keys::TARGET_YEAR) {
            cfg.target_year = parse_year(env_keys::TARGET_YEAR, &v)?;
        }
        if let Some(v) = get(env_keys::SHEET_URL) {
            cfg.sheet_endpoint = Url(v);
        }
        if let Some(v) = get(env_keys::CALENDAR_URL) {
            cfg.calendar_endpoint = Url(v);
        }
        if let Some(v) = get(env_keys::MARKET_STATUS_URL) {
            cfg.market_status_endpoint = Url(v);
        }
        cfg.calendar_api_key = get(env_keys::CALENDAR_API_KEY).map(ApiKey);
        cfg.market_status_api_key = get(env_keys::MARKET_STATUS_API_KEY).map(ApiKey);
        if let Some(v) = get(env_keys::HTTP_TIMEOUT) {
            cfg.http_timeout = parse_duration(env_keys::HTTP_TIMEOUT, &v)?;
        }
        if let Some(v) = get(env_keys::OUTPUT) {
            cfg.output_path = PathBuf::from(v);
        }
        cfg.name_table_path = get(env_keys::NAME_TABLE).map(PathBuf::from);

        debug!(
            current_date = %cfg.current_date,
            target_year = cfg.target_year,
            timezone = %cfg.timezone,
            has_calendar_key = cfg.calendar_api_key.is_some(),
            has_market_status_key = cfg.market_status_api_key.is_some(),
            "Loaded calendar configuration"
        );
        Ok(cfg)
    }

    pub fn with_current_date(self, current_date: NaiveDate) -> Self {
        Self {
            current_date,
            ..self
        }
    }

    pub fn with_target_year(self, target_year: i32) -> Self {
        Self {
            target_year,
            ..self
        }
    }

    pub fn with_timezone(self, timezone: Tz) -> Self {
        Self { timezone, ..self }
    }

    pub fn with_http_timeout(self, http_timeout: Duration) -> Self {
        Self {
            http_timeout,
            ..self
        }
    }

    pub fn with_output_path(self, output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..self
        }
    }

    pub fn with_name_table_path(self, path: impl Into<PathBuf>) -> Self {
        Self {
            name_table_path: Some(path.into()),
            ..self
        }
    }

    pub fn with_calendar_api_key(self, key: impl Into<ApiKey>) -> Self {
        Self {
            calendar_api_key: Some(key.into()),
            ..self
        }
    }

    pub fn with_market_status_api_key(self, key: impl Into<ApiKey>) -> Self {
        Self {
            market_status_api_key: Some(key.into()),
            ..self
        }
    }
}

/// Current calendar date in the given timezone.
pub fn today_in(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

pub fn parse_date(key: &str, value: &str) -> CalendarResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| invalid(key, value, e.to_string()))
}

pub fn parse_year(key: &str, value: &str) -> CalendarResult<i32> {
    let year = parse_value::<i32>(key, value)?;
    if !(1900..=9999).contains(&year) {
        return Err(invalid(key, value, "year must be within 1900..=9999".to_string()));
    }
    Ok(year)
}

pub fn parse_duration(key: &str, value: &str) -> CalendarResult<Duration> {
    humantime::parse_duration(value.trim()).map_err(|e| invalid(key, value, e.to_string()))
}

fn parse_value<T>(key: &str, value: &str) -> CalendarResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| invalid(key, value, e.to_string()))
}

fn invalid(key: &str, value: &str, msg: String) -> crate::error::CalendarError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        msg,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::CalendarError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let cfg = CalendarConfig::from_lookup(lookup(&[
            (env_keys::CURRENT_DATE, "2025-08-26"),
            (env_keys::TARGET_YEAR, "2025"),
            (env_keys::TIMEZONE, "America/New_York"),
            (env_keys::SHEET_URL, "http://localhost/sheet"),
            (env_keys::CALENDAR_API_KEY, "gcal-key"),
            (env_keys::MARKET_STATUS_API_KEY, "polygon-key"),
            (env_keys::HTTP_TIMEOUT, "5s"),
            (env_keys::OUTPUT, "out/events.csv"),
        ]))
        .expect("valid configuration");

        assert_eq!(cfg.current_date, NaiveDate::from_ymd_opt(2025, 8, 26).unwrap());
        assert_eq!(cfg.target_year, 2025);
        assert_eq!(cfg.timezone, chrono_tz::America::New_York);
        assert_eq!(cfg.sheet_endpoint, Url::from("http://localhost/sheet"));
        assert_eq!(cfg.calendar_endpoint, Url::from(DEFAULT_CALENDAR_URL));
        assert_eq!(cfg.calendar_api_key, Some(ApiKey::from("gcal-key")));
        assert_eq!(cfg.market_status_api_key, Some(ApiKey::from("polygon-key")));
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        assert_eq!(cfg.output_path, PathBuf::from("out/events.csv"));
        assert!(cfg.name_table_path.is_none());
    }

    #[test]
    fn test_target_year_defaults_to_cutoff_year() {
        let cfg = CalendarConfig::from_lookup(lookup(&[(env_keys::CURRENT_DATE, "2026-01-05")]))
            .expect("valid configuration");
        assert_eq!(cfg.target_year, 2026);
        assert_eq!(cfg.output_path, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(cfg.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_empty_values_are_absent() {
        let cfg = CalendarConfig::from_lookup(lookup(&[
            (env_keys::CURRENT_DATE, "2025-08-26"),
            (env_keys::CALENDAR_API_KEY, "  "),
        ]))
        .expect("valid configuration");
        assert!(cfg.calendar_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_date =
            CalendarConfig::from_lookup(lookup(&[(env_keys::CURRENT_DATE, "26/08/2025")]));
        assert!(matches!(
            bad_date,
            Err(CalendarError::Config(ConfigError::Invalid { .. }))
        ));

        let bad_tz = CalendarConfig::from_lookup(lookup(&[(env_keys::TIMEZONE, "Mars/Olympus")]));
        assert!(bad_tz.is_err());

        let bad_year = CalendarConfig::from_lookup(lookup(&[
            (env_keys::CURRENT_DATE, "2025-08-26"),
            (env_keys::TARGET_YEAR, "25"),
        ]));
        assert!(bad_year.is_err());

        let bad_timeout = CalendarConfig::from_lookup(lookup(&[
            (env_keys::CURRENT_DATE, "2025-08-26"),
            (env_keys::HTTP_TIMEOUT, "soon"),
        ]));
        assert!(bad_timeout.is_err());
    }

    #[test]
    fn test_builders_override_fields() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 8, 26).unwrap();
        let cfg = CalendarConfig::new(cutoff)
            .with_target_year(2026)
            .with_output_path("x.csv")
            .with_calendar_api_key("k")
            .with_market_status_api_key("p");
        assert_eq!(cfg.target_year, 2026);
        assert_eq!(cfg.output_path, PathBuf::from("x.csv"));
        assert_eq!(cfg.calendar_api_key, Some(ApiKey::from("k")));
        assert_eq!(cfg.market_status_api_key, Some(ApiKey::from("p")));
    }
}
