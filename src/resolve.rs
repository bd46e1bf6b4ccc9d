use crate::maps::Geocoder;
use crate::types::RawEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// City key assigned when no tier can derive a location
pub const UNKNOWN_CITY: &str = "Unknown";

/// The location fields a resolution can draw on, pulled out of the raw
/// payload up front so every tier is a pure function of this view.
#[derive(Debug, Default)]
struct LocationFields<'a> {
    /// Combined "City, Region" field on the event geo object
    city_state: Option<&'a str>,
    /// Calendar-level city and region (abbreviation preferred)
    calendar_city: Option<&'a str>,
    calendar_region: Option<&'a str>,
    /// Event-level city and region (full name preferred)
    city: Option<&'a str>,
    region: Option<&'a str>,
    full_address: Option<&'a str>,
    coordinate: Option<(f64, f64)>,
}

impl<'a> LocationFields<'a> {
    fn from_event(event: &'a RawEvent) -> Self {
        let str_at = |path: &str| event.pointer(path).and_then(|v| v.as_str());

        Self {
            city_state: str_at("/event/geo_address_info/city_state"),
            calendar_city: str_at("/calendar/geo_city"),
            calendar_region: str_at("/calendar/geo_region_abbrev")
                .or_else(|| str_at("/calendar/geo_region")),
            city: str_at("/event/geo_address_info/city"),
            region: str_at("/event/geo_address_info/region")
                .or_else(|| str_at("/event/geo_address_info/region_abbrev")),
            full_address: str_at("/event/geo_address_info/full_address"),
            coordinate: match (
                event.pointer("/event/coordinate/latitude").and_then(|v| v.as_f64()),
                event.pointer("/event/coordinate/longitude").and_then(|v| v.as_f64()),
            ) {
                (Some(lat), Some(lng)) => Some((lat, lng)),
                _ => None,
            },
        }
    }
}

// Fallback tiers, checked in order; the first match wins. Kept as an
// explicit list so the precedence is auditable in one place.
const TIERS: &[fn(&LocationFields) -> Option<String>] = &[
    combined_city_state,
    calendar_city,
    event_city,
    address_prefix,
];

/// The combined field is used verbatim when present; it already carries
/// the region, which keeps downstream map lookups unambiguous.
fn combined_city_state(fields: &LocationFields) -> Option<String> {
    fields.city_state.map(|s| s.to_string())
}

fn calendar_city(fields: &LocationFields) -> Option<String> {
    let city = fields.calendar_city?;
    match fields.calendar_region {
        Some(region) => Some(format!("{}, {}", city, region)),
        None => Some(city.to_string()),
    }
}

fn event_city(fields: &LocationFields) -> Option<String> {
    let city = fields.city?;
    match fields.region {
        Some(region) => Some(format!("{}, {}", city, region)),
        None => Some(city.to_string()),
    }
}

/// First two comma-separated segments of the free-form address; an
/// address without a comma is used whole.
fn address_prefix(fields: &LocationFields) -> Option<String> {
    let full = fields.full_address?;
    let parts: Vec<&str> = full.split(',').map(|p| p.trim()).collect();
    if parts.len() >= 2 {
        Some(format!("{}, {}", parts[0], parts[1]))
    } else {
        Some(full.trim().to_string())
    }
}

/// Resolves one event to a canonical city key via the fallback tiers,
/// with an optional reverse-geocode last resort. Reverse geocoding is
/// cached per coordinate pair so a run issues at most one lookup per
/// distinct venue location.
pub struct CityResolver<'a> {
    geocoder: Option<&'a dyn Geocoder>,
    geocode_cache: Mutex<HashMap<(u64, u64), Option<String>>>,
}

impl<'a> CityResolver<'a> {
    pub fn new(geocoder: Option<&'a dyn Geocoder>) -> Self {
        Self {
            geocoder,
            geocode_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, event: &RawEvent) -> String {
        let fields = LocationFields::from_event(event);

        for tier in TIERS {
            if let Some(city) = tier(&fields) {
                return city;
            }
        }

        if let (Some(geocoder), Some((lat, lng))) = (self.geocoder, fields.coordinate) {
            if let Some(city) = self.reverse_geocode_city(geocoder, lat, lng).await {
                return city;
            }
        }

        UNKNOWN_CITY.to_string()
    }

    async fn reverse_geocode_city(
        &self,
        geocoder: &dyn Geocoder,
        lat: f64,
        lng: f64,
    ) -> Option<String> {
        let cache_key = (lat.to_bits(), lng.to_bits());
        if let Some(cached) = self.geocode_cache.lock().unwrap().get(&cache_key) {
            return cached.clone();
        }

        let resolved = match geocoder.reverse_geocode(lat, lng).await {
            Ok(candidates) => candidates.first().and_then(|candidate| {
                let mut city_name = None;
                let mut region_name = None;
                for component in &candidate.address_components {
                    if component.types.iter().any(|t| t == "locality") {
                        city_name = Some(component.long_name.clone());
                    } else if component
                        .types
                        .iter()
                        .any(|t| t == "administrative_area_level_1")
                    {
                        region_name = Some(component.long_name.clone());
                    }
                }
                match (city_name, region_name) {
                    (Some(city), Some(region)) => Some(format!("{}, {}", city, region)),
                    (Some(city), None) => Some(city),
                    _ => None,
                }
            }),
            Err(e) => {
                // A failed lookup falls through to Unknown, never up.
                warn!("reverse geocoding failed for ({}, {}): {}", lat, lng, e);
                None
            }
        };

        debug!(lat, lng, city = ?resolved, "reverse geocode resolved");
        self.geocode_cache
            .lock()
            .unwrap()
            .insert(cache_key, resolved.clone());
        resolved
    }
}
