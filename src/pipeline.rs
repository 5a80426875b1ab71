use std::path::PathBuf;

use tracing::info;

use crate::{
    config::CalendarConfig,
    encode::{Encoder, EncodingTables},
    error::{CalendarResult, DataError},
    expiration::ExpirationRule,
    merge::merge_events,
    sink::CsvSink,
    source::{
        EventSource, HttpFetcher, SourceReport, calendar::CalendarSource, collect_events,
        market_status::MarketStatusSource, sheet::SheetSource,
    },
};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub merged: usize,
    pub written: usize,
    pub output: PathBuf,
}

/// Sources, encoder and sink wired together for one run.
pub struct Pipeline {
    sources: Vec<Box<dyn EventSource>>,
    encoder: Encoder,
    sink: CsvSink,
}

impl Pipeline {
    pub fn new(sources: Vec<Box<dyn EventSource>>, encoder: Encoder, sink: CsvSink) -> Self {
        Self {
            sources,
            encoder,
            sink,
        }
    }

    /// Builds the standard producers in merge order: sheet, calendar,
    /// market status, computed expirations.
    pub fn from_config(cfg: &CalendarConfig) -> CalendarResult<Self> {
        let http = HttpFetcher::new(cfg.http_timeout)?;
        let year = cfg.target_year;
        let cutoff = cfg.current_date;

        let sources: Vec<Box<dyn EventSource>> = vec![
            Box::new(SheetSource::new(
                http.clone(),
                cfg.sheet_endpoint.clone(),
                year,
                cutoff,
            )),
            Box::new(CalendarSource::new(
                http.clone(),
                cfg.calendar_endpoint.clone(),
                cfg.calendar_api_key.clone(),
                year,
                cutoff,
            )),
            Box::new(MarketStatusSource::new(
                http,
                cfg.market_status_endpoint.clone(),
                cfg.market_status_api_key.clone(),
                year,
                cutoff,
            )),
            Box::new(ExpirationRule::new(year, cutoff)),
        ];

        let tables = match &cfg.name_table_path {
            Some(path) => EncodingTables::default().with_names(path)?,
            None => EncodingTables::default(),
        };

        Ok(Self::new(
            sources,
            Encoder::new(tables),
            CsvSink::new(&cfg.output_path),
        ))
    }

    /// Collects, merges, encodes and writes.
    ///
    /// Fails without touching the output if no event survives the merge.
    #[tracing::instrument(skip(self), fields(output = %self.sink.path().display()), err)]
    pub async fn run(&self) -> CalendarResult<RunSummary> {
        let (raw, sources) = collect_events(&self.sources).await;
        let raw_count = raw.len();

        let merged = merge_events(raw);
        info!(raw = raw_count, merged = merged.len(), "Merged calendar events");
        if merged.is_empty() {
            return Err(DataError::NoEventsFound(
                "every source was empty or failed".to_string(),
            )
            .into());
        }

        let records = self.encoder.encode_all(&merged);
        let written = self.sink.write(&records)?;

        Ok(RunSummary {
            sources,
            merged: merged.len(),
            written,
            output: self.sink.path().to_path_buf(),
        })
    }
}
