// 1. Traits
pub use crate::source::EventSource;

// 2. Event Model
pub use crate::event::{
    CanonicalEvent, Category, Color, DedupKey, RawEvent, is_upcoming, parse_event_date,
    sanitize_details,
};

// 3. Pipeline Stages
pub use crate::encode::{DecodedRecord, EncodedRecord, Encoder, EncodingTables};
pub use crate::expiration::{ExpirationRule, monthly_expirations, third_friday};
pub use crate::merge::merge_events;
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::sink::CsvSink;

// 4. Sources
pub use crate::source::{
    ApiKey, HttpFetcher, SourceReport, Url,
    calendar::{CalendarSource, parse_calendar_items},
    collect_events,
    market_status::{MarketStatusSource, parse_market_status},
    sheet::{SheetSource, parse_sheet_rows},
};

// 5. Errors
pub use crate::error::{
    CalendarError, CalendarResult, ConfigError, DataError, IoError, TransportError,
};

// 6. Configuration
pub use crate::config::CalendarConfig;
