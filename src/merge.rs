use crate::sources::SourceResult;
use crate::types::{self, RawEvent};
use chrono::{DateTime, Utc};
use tracing::info;

/// Combine the per-source result lists into one globally time-ordered
/// sequence. Events with no parseable start timestamp sort after all
/// timestamped events; the sort is stable, so ties and untimestamped
/// events keep their pre-sort relative order.
pub fn merge_events(results: Vec<SourceResult>) -> Vec<RawEvent> {
    let mut all_events: Vec<RawEvent> = Vec::new();
    for result in results {
        info!(
            source = %result.source_name,
            events = result.events.len(),
            "collected events from source"
        );
        all_events.extend(result.events);
    }

    all_events.sort_by_key(sort_key);
    all_events
}

/// Sort key over (missing-timestamp, timestamp): timestamped events first
/// in ascending order, the rest at the end.
fn sort_key(event: &RawEvent) -> (bool, Option<DateTime<Utc>>) {
    let start = types::start_at(event);
    (start.is_none(), start)
}
