use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use luma_aggregator::enrich::EnrichmentStatus;
use luma_aggregator::error::{AggregatorError, Result};
use luma_aggregator::filter::{EventFilter, FilterCriteria};
use luma_aggregator::maps::{DistanceClient, DistanceElement, ValueText};
use luma_aggregator::merge::merge_events;
use luma_aggregator::resolve::CityResolver;
use luma_aggregator::sources::{fetch_all_sources, PageFetcher, PageResponse};
use luma_aggregator::summary::build_summary;
use luma_aggregator::types::{RawEvent, SourceDescriptor, SourceKind};

fn event(id: &str, start_at: &str, city_state: &str) -> RawEvent {
    json!({
        "api_id": id,
        "start_at": start_at,
        "event": {
            "name": format!("Event {}", id),
            "start_at": start_at,
            "geo_address_info": {
                "city": city_state.split(',').next().unwrap().trim(),
                "city_state": city_state
            }
        }
    })
}

/// Serves a fixed page script per source; pages past the script fail.
struct FixtureFetcher {
    pages: Mutex<HashMap<String, Vec<PageResponse>>>,
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        _cursor: Option<&str>,
    ) -> Result<PageResponse> {
        let mut pages = self.pages.lock().unwrap();
        let script = pages.get_mut(&source.name).expect("unknown source");
        if script.is_empty() {
            return Err(AggregatorError::Api {
                message: "simulated failure".to_string(),
            });
        }
        Ok(script.remove(0))
    }
}

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
                value: 16093,
                text: "10 mi".to_string(),
            }),
            duration: Some(ValueText {
                value: 900,
                text: "15 mins".to_string(),
            }),
        })
    }
}

fn slug_source(name: &str) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        kind: SourceKind::Slug {
            slug: name.to_string(),
        },
    }
}

fn page(entries: Vec<RawEvent>, next_cursor: Option<&str>) -> PageResponse {
    PageResponse {
        has_more: next_cursor.is_some(),
        next_cursor: next_cursor.map(|c| c.to_string()),
        entries,
    }
}

#[tokio::test]
async fn fetch_merge_summarize_end_to_end() {
    let mut scripts = HashMap::new();
    scripts.insert(
        "tech".to_string(),
        vec![page(
            vec![
                event("t1", "2025-09-03T01:00:00Z", "Austin, Texas"),
                event("t2", "2025-09-01T01:00:00Z", "Austin, Texas"),
            ],
            None,
        )],
    );
    scripts.insert("ai".to_string(), vec![page(vec![], None)]);
    // Fails after its first page; first-page events must survive.
    scripts.insert(
        "sf".to_string(),
        vec![page(
            vec![
                event("s1", "2025-09-02T01:00:00Z", "Oakland, California"),
                event("s2", "2025-09-04T01:00:00Z", "Oakland, California"),
                event("s3", "2025-09-05T01:00:00Z", "Berkeley, California"),
            ],
            Some("cursor-1"),
        )],
    );

    let fetcher = FixtureFetcher {
        pages: Mutex::new(scripts),
    };
    let sources = vec![slug_source("tech"), slug_source("ai"), slug_source("sf")];

    let results = fetch_all_sources(&fetcher, &sources, 0).await;
    assert_eq!(results.len(), 3);
    assert!(results[2].error.is_some());

    let merged = merge_events(results);
    assert_eq!(merged.len(), 5);

    // Sorted by start timestamp across sources.
    let ids: Vec<&str> = merged
        .iter()
        .map(|e| e["api_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["t2", "s1", "t1", "s2", "s3"]);

    // Summary: grouped counts, one lookup per distinct city.
    let resolver = CityResolver::new(None);
    let client = CountingDistanceClient {
        calls: AtomicUsize::new(0),
    };
    let summary = build_summary(&merged, &resolver, Some((&client, "San Jose, CA"))).await;

    assert_eq!(summary.summary.len(), 3);
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);

    let austin = summary
        .summary
        .iter()
        .find(|e| e.city == "Austin, Texas")
        .unwrap();
    assert_eq!(austin.count, 2);
    let enrichment = austin.enrichment.as_ref().unwrap();
    assert_eq!(enrichment.status, EnrichmentStatus::Ok);
    assert_eq!(enrichment.distance_miles, Some(10.0));

    // Count-descending order puts a count-2 city first.
    assert_eq!(summary.summary[0].count, 2);
}

#[tokio::test]
async fn merged_snapshot_filters_by_weekday() {
    // 2025-09-06T20:00Z is Saturday afternoon Pacific;
    // 2025-09-01T01:00Z is still Sunday Aug 31 Pacific.
    let events = vec![
        event("sat", "2025-09-06T20:00:00Z", "Oakland, California"),
        event("sun", "2025-09-01T01:00:00Z", "Oakland, California"),
        json!({ "event": { "name": "No start", "geo_address_info": { "city": "Oakland" } } }),
    ];

    let filter = EventFilter::new(chrono_tz::America::Los_Angeles);
    let criteria = FilterCriteria {
        weekdays: vec!["Saturday".to_string()],
        ..Default::default()
    };

    let matched = filter.apply(&events, &criteria);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0]["api_id"], "sat");
}
