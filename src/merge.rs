use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::event::{CanonicalEvent, RawEvent};

/// Sanitizes, deduplicates and orders events from all sources.
///
/// Events are bucketed by day; within a day an event is kept only if no
/// earlier event has the same `(date, category, details)` key, so input
/// order decides which of two identical events survives. Days come out in
/// chronological order, events within a day in arrival order.
pub fn merge_events<I>(events: I) -> Vec<CanonicalEvent>
where
    I: IntoIterator<Item = RawEvent>,
{
    let mut by_date: BTreeMap<NaiveDate, Vec<CanonicalEvent>> = BTreeMap::new();
    let mut dropped = 0usize;

    for raw in events {
        let event = CanonicalEvent::from(raw);
        let bucket = by_date.entry(event.date).or_default();
        if bucket.iter().any(|e| e.dedup_key() == event.dedup_key()) {
            dropped += 1;
            continue;
        }
        bucket.push(event);
    }

    let merged: Vec<CanonicalEvent> = by_date.into_values().flatten().collect();
    debug!(merged = merged.len(), dropped, "Merged events");
    merged
}
