//! Aggregates market-calendar events (holidays, early closes, expirations,
//! user events) from several feeds into one deduplicated timeline and writes
//! it as an OHLCV-shaped CSV for charting tools.

pub mod config;
pub mod encode;
pub mod error;
pub mod event;
pub mod expiration;
mod macros;
pub mod merge;
pub mod pipeline;
pub mod prelude;
pub mod sink;
pub mod source;
