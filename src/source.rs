pub mod calendar;
pub mod market_status;
pub mod sheet;

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::{CalendarResult, TransportError},
    event::RawEvent,
    impl_from_primitive, impl_from_str_ref,
};

/// Represents a feed endpoint URL.
///
/// # Examples
///
/// ```
/// # use market_calendar::prelude::*;
/// let url = Url::from("https://api.example.com");
/// assert_eq!(url.0, "https://api.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url(pub String);
impl_from_primitive!(Url, String);
impl_from_str_ref!(Url);

/// Represents an API key for a feed.
///
/// The key is sent as a query parameter, so it is never logged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiKey(pub String);
impl_from_primitive!(ApiKey, String);
impl_from_str_ref!(ApiKey);

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ================================================================================================
// Event Sources
// ================================================================================================

/// A producer of raw calendar events.
///
/// Implementations apply the future-only filter themselves. A failing source
/// returns `Err`; [`collect_events`] decides what to do with it.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Short name used in logs and the run summary.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> CalendarResult<Vec<RawEvent>>;
}

/// Number of events a source contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: &'static str,
    /// `None` if the source failed and was replaced by an empty list.
    pub count: Option<usize>,
}

/// Runs every source in order and concatenates their events.
///
/// A failing source never aborts the run: its error is logged and it
/// contributes no events.
pub async fn collect_events(
    sources: &[Box<dyn EventSource>],
) -> (Vec<RawEvent>, Vec<SourceReport>) {
    let mut events = Vec::new();
    let mut reports = Vec::with_capacity(sources.len());

    for source in sources {
        let name = source.name();
        match source.fetch().await {
            Ok(batch) => {
                info!(source = name, count = batch.len(), "Fetched events");
                reports.push(SourceReport {
                    name,
                    count: Some(batch.len()),
                });
                events.extend(batch);
            }
            Err(e) => {
                warn!(source = name, error = %e, "Source failed, continuing without its events");
                reports.push(SourceReport { name, count: None });
            }
        }
    }

    (events, reports)
}

// ================================================================================================
// HTTP
// ================================================================================================

/// Thin JSON-over-HTTP client shared by the network sources.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> CalendarResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Issues a `GET` and decodes the JSON body into `T`.
    #[tracing::instrument(skip(self, url, query), fields(url = %url.0), err)]
    pub async fn get_json<T>(&self, url: &Url, query: &[(&str, &str)]) -> CalendarResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(&url.0)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.0.clone(),
                msg: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.0.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.json::<T>().await.map_err(|e| TransportError::Body {
            url: url.0.clone(),
            msg: e.without_url().to_string(),
        })?;
        Ok(body)
    }
}

// ================================================================================================
// Payload Helpers
// ================================================================================================

/// Deserializes an optional loosely typed scalar into text.
///
/// Spreadsheet-backed feeds emit numbers or booleans where text is expected
/// (e.g. a close time of `13`); those are rendered as their JSON text. `null`
/// and missing fields become `None`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Trimmed text, or empty if absent.
pub(crate) fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}
