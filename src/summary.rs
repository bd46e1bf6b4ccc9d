use crate::enrich::{enrich_cities, EnrichmentResult};
use crate::maps::DistanceClient;
use crate::resolve::CityResolver;
use crate::types::RawEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// One city's row in the summary: resolved key, event count, and the
/// distance lookup outcome. Runs without enrichment configured mark every
/// row NOT_ATTEMPTED instead of carrying distance values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySummaryEntry {
    pub city: String,
    pub count: usize,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentResult>,
}

/// The persisted city summary document
#[derive(Debug, Serialize, Deserialize)]
pub struct CitySummary {
    pub generated_at: DateTime<Utc>,
    pub summary: Vec<CitySummaryEntry>,
}

/// Resolve every event's city, count occurrences per key, and optionally
/// attach distance/duration data from one enrichment pass over the
/// distinct keys. Entries are ordered by descending count; ties keep
/// first-seen order.
#[instrument(skip_all, fields(events = events.len()))]
pub async fn build_summary(
    events: &[RawEvent],
    resolver: &CityResolver<'_>,
    enrichment: Option<(&dyn DistanceClient, &str)>,
) -> CitySummary {
    // Count per city, remembering first-seen order for stable ties.
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for event in events {
        let city = resolver.resolve(event).await;
        if !counts.contains_key(&city) {
            first_seen.push(city.clone());
        }
        *counts.entry(city).or_insert(0) += 1;
    }

    info!(cities = first_seen.len(), "resolved cities for summary");

    // The distinct-key list is built before any external call; it is what
    // bounds enrichment to one lookup per city.
    let enrichment_attempted = enrichment.is_some();
    let mut enrichment_results = match enrichment {
        Some((client, reference_location)) => {
            enrich_cities(client, reference_location, &first_seen).await
        }
        None => HashMap::new(),
    };

    let mut entries: Vec<CitySummaryEntry> = first_seen
        .into_iter()
        .map(|city| {
            let count = counts[&city];
            let enrichment = if enrichment_attempted {
                enrichment_results.remove(&city)
            } else {
                Some(EnrichmentResult::not_attempted())
            };
            CitySummaryEntry {
                city,
                count,
                enrichment,
            }
        })
        .collect();

    // Stable sort keeps first-seen order for equal counts.
    entries.sort_by(|a, b| b.count.cmp(&a.count));

    CitySummary {
        generated_at: Utc::now(),
        summary: entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnrichmentStatus;
    use crate::error::Result;
    use crate::maps::{DistanceElement, ValueText};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDistanceClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DistanceClient for CountingDistanceClient {
        async fn distance(&self, _origin: &str, _destination: &str) -> Result<DistanceElement> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DistanceElement {
                status: "OK".to_string(),
                distance: Some(ValueText {
                    value: 160934,
                    text: "100 mi".to_string(),
                }),
                duration: Some(ValueText {
                    value: 5400,
                    text: "1 hour 30 mins".to_string(),
                }),
            })
        }
    }

    fn event_in(city_state: &str) -> RawEvent {
        json!({ "event": { "geo_address_info": { "city_state": city_state } } })
    }

    #[tokio::test]
    async fn test_counts_group_by_resolved_city() {
        let events = vec![
            event_in("Austin, Texas"),
            event_in("Oakland, California"),
            event_in("Austin, Texas"),
        ];
        let resolver = CityResolver::new(None);

        let summary = build_summary(&events, &resolver, None).await;

        assert_eq!(summary.summary.len(), 2);
        assert_eq!(summary.summary[0].city, "Austin, Texas");
        assert_eq!(summary.summary[0].count, 2);
        assert_eq!(summary.summary[1].count, 1);
    }

    #[tokio::test]
    async fn test_ties_keep_first_seen_order() {
        let events = vec![
            event_in("Berkeley, California"),
            event_in("Oakland, California"),
        ];
        let resolver = CityResolver::new(None);

        let summary = build_summary(&events, &resolver, None).await;

        assert_eq!(summary.summary[0].city, "Berkeley, California");
        assert_eq!(summary.summary[1].city, "Oakland, California");
    }

    #[tokio::test]
    async fn test_duplicate_cities_enriched_once() {
        let events = vec![event_in("Austin, Texas"), event_in("Austin, Texas")];
        let resolver = CityResolver::new(None);
        let client = CountingDistanceClient {
            calls: AtomicUsize::new(0),
        };

        let summary =
            build_summary(&events, &resolver, Some((&client, "San Francisco, CA"))).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        let entry = &summary.summary[0];
        assert_eq!(entry.count, 2);
        let enrichment = entry.enrichment.as_ref().unwrap();
        assert_eq!(enrichment.status, EnrichmentStatus::Ok);
        assert_eq!(enrichment.distance_miles, Some(100.0));
        assert_eq!(enrichment.duration_minutes, Some(90.0));
    }

    #[tokio::test]
    async fn test_summary_without_enrichment_marks_entries_not_attempted() {
        let events = vec![event_in("Austin, Texas")];
        let resolver = CityResolver::new(None);

        let summary = build_summary(&events, &resolver, None).await;

        let enrichment = summary.summary[0].enrichment.as_ref().unwrap();
        assert_eq!(enrichment.status, EnrichmentStatus::NotAttempted);
        assert!(enrichment.distance_miles.is_none());
        assert!(enrichment.duration_minutes.is_none());

        let value = serde_json::to_value(&summary.summary[0]).unwrap();
        assert_eq!(value["status"], "NOT_ATTEMPTED");
    }

    #[tokio::test]
    async fn test_serialized_entry_flattens_enrichment() {
        let events = vec![event_in("Austin, Texas")];
        let resolver = CityResolver::new(None);
        let client = CountingDistanceClient {
            calls: AtomicUsize::new(0),
        };

        let summary =
            build_summary(&events, &resolver, Some((&client, "San Francisco, CA"))).await;
        let value = serde_json::to_value(&summary.summary[0]).unwrap();

        assert_eq!(value["city"], "Austin, Texas");
        assert_eq!(value["count"], 1);
        assert_eq!(value["status"], "OK");
        assert_eq!(value["distance_miles"], 100.0);
    }
}
