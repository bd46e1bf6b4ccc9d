use crate::error::{AggregatorError, Result};
use crate::types::{BoundingBox, SourceDescriptor, SourceKind};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub slugs: Vec<String>,
    #[serde(default)]
    pub calendars: Vec<CalendarConfig>,
}

#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    /// Events requested per page
    pub pagination_limit: u32,
    /// Delay between pages of the same source, to be polite to the API
    pub delay_ms: u64,
    pub output_dir: String,
    /// Timezone used when filtering by local date or weekday
    pub timezone: String,
    /// Travel mode for distance lookups: "driving" or "walking"
    pub travel_mode: String,
}

#[derive(Debug, Deserialize)]
pub struct CalendarConfig {
    pub calendar_api_id: String,
    pub name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            AggregatorError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;

        if config.slugs.is_empty() && config.calendars.is_empty() {
            return Err(AggregatorError::Config(
                "config must declare at least one slug or calendar source".to_string(),
            ));
        }

        Ok(config)
    }

    /// Expand the configured slugs and calendars into source descriptors,
    /// slug feeds first, preserving config order within each group.
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        let mut sources = Vec::new();
        for slug in &self.slugs {
            sources.push(SourceDescriptor {
                name: slug.clone(),
                kind: SourceKind::Slug { slug: slug.clone() },
            });
        }
        for calendar in &self.calendars {
            sources.push(SourceDescriptor {
                name: calendar.name.clone(),
                kind: SourceKind::Calendar {
                    calendar_api_id: calendar.calendar_api_id.clone(),
                },
            });
        }
        sources
    }
}
