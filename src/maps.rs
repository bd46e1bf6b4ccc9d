use crate::error::{AggregatorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// One candidate match from a reverse-geocode lookup
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Distance Matrix element for a single origin-destination pair
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceElement {
    #[serde(default)]
    pub status: String,
    pub distance: Option<ValueText>,
    pub duration: Option<ValueText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueText {
    /// Meters for distances, seconds for durations
    pub value: i64,
    #[serde(default)]
    pub text: String,
}

/// Reverse-geocode capability. An empty candidate list signals no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Vec<GeocodeCandidate>>;
}

/// Drive distance/duration capability between two free-form locations
#[async_trait]
pub trait DistanceClient: Send + Sync {
    async fn distance(&self, origin: &str, destination: &str) -> Result<DistanceElement>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceElement>,
}

/// Live client for the Google Maps geocoding and Distance Matrix APIs
pub struct GoogleMapsClient {
    client: reqwest::Client,
    api_key: String,
    travel_mode: String,
}

impl GoogleMapsClient {
    pub fn new(client: reqwest::Client, api_key: String, travel_mode: String) -> Self {
        Self {
            client,
            api_key,
            travel_mode,
        }
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Vec<GeocodeCandidate>> {
        let latlng = format!("{},{}", lat, lng);
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" => {
                debug!(candidates = response.results.len(), "reverse geocode hit");
                Ok(response.results)
            }
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(AggregatorError::Api {
                message: format!("geocode request failed with status {}", other),
            }),
        }
    }
}

#[async_trait]
impl DistanceClient for GoogleMapsClient {
    async fn distance(&self, origin: &str, destination: &str) -> Result<DistanceElement> {
        let response: DistanceMatrixResponse = self
            .client
            .get(DISTANCE_MATRIX_URL)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("mode", self.travel_mode.as_str()),
                ("units", "imperial"),
                ("departure_time", "now"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            warn!(status = %response.status, destination, "distance matrix request rejected");
            return Err(AggregatorError::Api {
                message: format!("distance matrix request failed with status {}", response.status),
            });
        }

        response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| AggregatorError::Api {
                message: "distance matrix response carried no elements".to_string(),
            })
    }
}
