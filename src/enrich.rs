use crate::maps::DistanceClient;
use crate::resolve::UNKNOWN_CITY;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichmentStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "INVALID_LOCATION")]
    InvalidLocation,
    #[serde(rename = "NOT_ATTEMPTED")]
    NotAttempted,
}

/// Distance and travel time from the reference location to one city,
/// in both the source units and derived imperial/minute forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub status: EnrichmentStatus,
    pub distance_text: Option<String>,
    pub distance_meters: Option<i64>,
    pub distance_miles: Option<f64>,
    pub duration_text: Option<String>,
    pub duration_seconds: Option<i64>,
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichmentResult {
    /// Marker for cities whose lookup was skipped for the whole run,
    /// e.g. when no credential or reference location is configured.
    pub fn not_attempted() -> Self {
        Self::without_values(EnrichmentStatus::NotAttempted)
    }

    fn without_values(status: EnrichmentStatus) -> Self {
        Self {
            status,
            distance_text: None,
            distance_meters: None,
            distance_miles: None,
            duration_text: None,
            duration_seconds: None,
            duration_minutes: None,
            error: None,
        }
    }
}

pub fn meters_to_miles(meters: i64) -> f64 {
    (meters as f64 / METERS_PER_MILE * 100.0).round() / 100.0
}

pub fn seconds_to_minutes(seconds: i64) -> f64 {
    (seconds as f64 / 60.0 * 10.0).round() / 10.0
}

/// Look up distance/duration from the reference location to every distinct
/// city key. Exactly one external call is made per key; the literal
/// Unknown key is assigned a fixed invalid-location status with no call.
/// A failed lookup is recorded on its key and never stops the batch.
#[instrument(skip(client, cities), fields(cities = cities.len()))]
pub async fn enrich_cities(
    client: &dyn DistanceClient,
    reference_location: &str,
    cities: &[String],
) -> HashMap<String, EnrichmentResult> {
    let mut results = HashMap::new();

    for (i, city) in cities.iter().enumerate() {
        if city == UNKNOWN_CITY {
            info!("[{}/{}] skipping unknown location", i + 1, cities.len());
            results.insert(
                city.clone(),
                EnrichmentResult::without_values(EnrichmentStatus::InvalidLocation),
            );
            continue;
        }

        info!("[{}/{}] querying distance for {}", i + 1, cities.len(), city);
        let result = match client.distance(reference_location, city).await {
            Ok(element) => match element.status.as_str() {
                "OK" => {
                    let distance = element.distance;
                    let duration = element.duration;
                    EnrichmentResult {
                        status: EnrichmentStatus::Ok,
                        distance_text: distance.as_ref().map(|d| d.text.clone()),
                        distance_meters: distance.as_ref().map(|d| d.value),
                        distance_miles: distance.as_ref().map(|d| meters_to_miles(d.value)),
                        duration_text: duration.as_ref().map(|d| d.text.clone()),
                        duration_seconds: duration.as_ref().map(|d| d.value),
                        duration_minutes: duration.as_ref().map(|d| seconds_to_minutes(d.value)),
                        error: None,
                    }
                }
                "NOT_FOUND" | "ZERO_RESULTS" => {
                    warn!(city = %city, status = %element.status, "no route found");
                    EnrichmentResult::without_values(EnrichmentStatus::NotFound)
                }
                other => {
                    warn!(city = %city, status = %other, "unexpected element status");
                    EnrichmentResult::without_values(EnrichmentStatus::Error)
                }
            },
            Err(e) => {
                warn!(city = %city, "distance lookup failed: {}", e);
                let mut result = EnrichmentResult::without_values(EnrichmentStatus::Error);
                result.error = Some(e.to_string());
                result
            }
        };

        results.insert(city.clone(), result);
    }

    results
}
