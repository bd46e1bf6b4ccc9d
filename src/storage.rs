use crate::error::Result;
use crate::summary::CitySummary;
use crate::types::RawEvent;
use std::fs;
use std::path::Path;
use tracing::info;

pub const COMBINED_EVENTS_FILE: &str = "combined_events.json";
pub const CITY_SUMMARY_FILE: &str = "city_summary.json";

/// Persist the merged, time-ordered event snapshot
pub fn write_combined_events(output_dir: &str, events: &[RawEvent]) -> Result<String> {
    write_json(output_dir, COMBINED_EVENTS_FILE, &events)
}

/// Persist the city summary document
pub fn write_city_summary(output_dir: &str, summary: &CitySummary) -> Result<String> {
    write_json(output_dir, CITY_SUMMARY_FILE, summary)
}

/// Load a previously written combined-events snapshot
pub fn load_combined_events(path: &str) -> Result<Vec<RawEvent>> {
    let content = fs::read_to_string(path)?;
    let events: Vec<RawEvent> = serde_json::from_str(&content)?;
    Ok(events)
}

fn write_json<T: serde::Serialize>(output_dir: &str, filename: &str, value: &T) -> Result<String> {
    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    let filepath = Path::new(output_dir).join(filename);
    let json_content = serde_json::to_string_pretty(value)?;
    fs::write(&filepath, json_content)?;

    let path = filepath.to_string_lossy().to_string();
    info!(path = %path, "wrote snapshot");
    Ok(path)
}
