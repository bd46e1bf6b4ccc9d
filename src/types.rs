use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw event listing as returned by the feed APIs. Payloads are kept opaque
/// and persisted verbatim; only the fields below are ever interpreted.
pub type RawEvent = serde_json::Value;

/// Coordinate rectangle constraining a feed query
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// One independently paginated feed contributing events to a run
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Stable display name used for logging and attribution
    pub name: String,
    pub kind: SourceKind,
}

#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Discover feed scoped by slug
    Slug { slug: String },
    /// Calendar feed scoped by calendar API id
    Calendar { calendar_api_id: String },
}

/// Start timestamp, from the top level or the nested event object.
/// Feeds emit ISO-8601 UTC with a `Z` suffix and optional fractional seconds.
pub fn start_at(event: &RawEvent) -> Option<DateTime<Utc>> {
    let raw = event
        .get("start_at")
        .and_then(|v| v.as_str())
        .or_else(|| event.pointer("/event/start_at").and_then(|v| v.as_str()))?;
    parse_timestamp(raw)
}

/// End timestamp, same field layout as `start_at`
pub fn end_at(event: &RawEvent) -> Option<DateTime<Utc>> {
    let raw = event
        .get("end_at")
        .and_then(|v| v.as_str())
        .or_else(|| event.pointer("/event/end_at").and_then(|v| v.as_str()))?;
    parse_timestamp(raw)
}

pub fn event_name(event: &RawEvent) -> &str {
    event
        .pointer("/event/name")
        .and_then(|v| v.as_str())
        .or_else(|| event.get("name").and_then(|v| v.as_str()))
        .unwrap_or("Unnamed Event")
}

/// Bare city field from the nested geo object, used by the filter
pub fn bare_city(event: &RawEvent) -> Option<&str> {
    event
        .pointer("/event/geo_address_info/city")
        .and_then(|v| v.as_str())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
