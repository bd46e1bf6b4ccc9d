use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use luma_aggregator::config::Config;
use luma_aggregator::filter::{EventFilter, FilterCriteria};
use luma_aggregator::location::detect_reference_location;
use luma_aggregator::logging;
use luma_aggregator::maps::{DistanceClient, Geocoder, GoogleMapsClient};
use luma_aggregator::merge::merge_events;
use luma_aggregator::resolve::CityResolver;
use luma_aggregator::sources::{fetch_all_sources, HttpPageFetcher};
use luma_aggregator::storage;
use luma_aggregator::summary::build_summary;
use luma_aggregator::types::RawEvent;

#[derive(Parser)]
#[command(name = "luma_aggregator")]
#[command(about = "Luma event fetching, aggregation, and filtering")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured sources, merge, and write both snapshots
    Fetch {
        /// Reference location for distance lookups (skips IP detection)
        #[arg(long)]
        location: Option<String>,
        /// Produce a count-only summary without distance lookups
        #[arg(long)]
        skip_enrichment: bool,
    },
    /// Rebuild the city summary from an existing combined snapshot
    Summarize {
        /// Path to a combined events snapshot
        #[arg(long, default_value = "aggregated_events/combined_events.json")]
        file: String,
        /// Reference location for distance lookups (skips IP detection)
        #[arg(long)]
        location: Option<String>,
    },
    /// Filter a combined snapshot by location, date, or weekday
    Filter {
        /// Path to a combined events snapshot
        #[arg(long, default_value = "aggregated_events/combined_events.json")]
        file: String,
        /// City name to filter by (case-insensitive)
        #[arg(long)]
        location: Option<String>,
        /// Specific dates to filter by (YYYY-MM-DD)
        #[arg(long, num_args = 0..)]
        dates: Vec<NaiveDate>,
        /// Weekdays to filter by (e.g. Monday Tuesday)
        #[arg(long, num_args = 0..)]
        weekdays: Vec<String>,
        /// Include events on today's date in the reference timezone
        #[arg(long)]
        today: bool,
        /// Timezone for local dates and weekdays (overrides config.toml)
        #[arg(long)]
        timezone: Option<String>,
        /// Emit a JSON array instead of human-readable lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            location,
            skip_enrichment,
        } => run_fetch(location, skip_enrichment).await,
        Commands::Summarize { file, location } => run_summarize(&file, location).await,
        Commands::Filter {
            file,
            location,
            dates,
            weekdays,
            today,
            timezone,
            json,
        } => run_filter(&file, location, dates, weekdays, today, timezone, json),
    }
}

async fn run_fetch(location: Option<String>, skip_enrichment: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = reqwest::Client::new();

    // Enrichment credentials are validated before any fetching starts;
    // without them the requested output is impossible, not degraded.
    let enricher = if skip_enrichment {
        None
    } else {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY").map_err(|_| {
            anyhow!("GOOGLE_MAPS_API_KEY is required (or pass --skip-enrichment)")
        })?;
        let reference_location = match location {
            Some(location) => location,
            None => detect_reference_location(&client)
                .await
                .ok_or_else(|| anyhow!("could not detect reference location; pass --location"))?,
        };
        println!("📍 Reference location: {}", reference_location);
        Some((
            GoogleMapsClient::new(client.clone(), api_key, config.fetch.travel_mode.clone()),
            reference_location,
        ))
    };

    let sources = config.sources();
    println!("📡 Fetching events from {} sources...", sources.len());

    let fetcher = HttpPageFetcher::new(
        client.clone(),
        config.bounding_box,
        config.fetch.pagination_limit,
    );
    let results = fetch_all_sources(&fetcher, &sources, config.fetch.delay_ms).await;

    for result in &results {
        match &result.error {
            Some(error) => {
                warn!(source = %result.source_name, "source finished with partial data: {}", error);
                println!(
                    "⚠️  [{}] {} events ({} pages, stopped early: {})",
                    result.source_name,
                    result.events.len(),
                    result.pages_fetched,
                    error
                );
            }
            None => println!(
                "✅ [{}] {} events ({} pages)",
                result.source_name,
                result.events.len(),
                result.pages_fetched
            ),
        }
    }

    let merged = merge_events(results);
    if merged.is_empty() {
        warn!("no events fetched from any source; skipping snapshot output");
        println!("⚠️  No events fetched; nothing to write");
        return Ok(());
    }
    println!("✓ Merged {} events, sorted by start time", merged.len());

    let combined_path = storage::write_combined_events(&config.fetch.output_dir, &merged)?;
    println!("💾 Saved combined events to {}", combined_path);

    let summary_path = write_summary(&config, &merged, enricher.as_ref()).await?;
    println!("💾 Saved city summary to {}", summary_path);

    println!("\n🎉 Processed {} events from {} sources", merged.len(), sources.len());
    Ok(())
}

async fn run_summarize(file: &str, location: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let events = storage::load_combined_events(file)
        .with_context(|| format!("failed to load snapshot '{}'", file))?;
    println!("✓ Loaded {} events from {}", events.len(), file);

    let client = reqwest::Client::new();

    // Missing credentials degrade this path to a count-only summary.
    let enricher = match std::env::var("GOOGLE_MAPS_API_KEY") {
        Ok(api_key) => {
            let reference_location = match location {
                Some(location) => Some(location),
                None => detect_reference_location(&client).await,
            };
            match reference_location {
                Some(reference_location) => {
                    println!("📍 Reference location: {}", reference_location);
                    Some((
                        GoogleMapsClient::new(
                            client.clone(),
                            api_key,
                            config.fetch.travel_mode.clone(),
                        ),
                        reference_location,
                    ))
                }
                None => {
                    warn!("could not detect reference location; writing count-only summary");
                    println!("⚠️  Could not detect reference location; summary will be count-only");
                    None
                }
            }
        }
        Err(_) => {
            warn!("GOOGLE_MAPS_API_KEY not set; writing count-only summary");
            println!("⚠️  GOOGLE_MAPS_API_KEY not set; summary will be count-only");
            None
        }
    };

    let summary_path = write_summary(&config, &events, enricher.as_ref()).await?;
    println!("💾 Saved city summary to {}", summary_path);
    Ok(())
}

async fn write_summary(
    config: &Config,
    events: &[RawEvent],
    enricher: Option<&(GoogleMapsClient, String)>,
) -> anyhow::Result<String> {
    let geocoder = enricher.map(|(maps, _)| maps as &dyn Geocoder);
    let resolver = CityResolver::new(geocoder);
    let enrichment = enricher.map(|(maps, reference)| (maps as &dyn DistanceClient, reference.as_str()));

    println!("📊 Building city summary...");
    let summary = build_summary(events, &resolver, enrichment).await;
    info!(cities = summary.summary.len(), "city summary built");

    let path = storage::write_city_summary(&config.fetch.output_dir, &summary)?;
    Ok(path)
}

fn run_filter(
    file: &str,
    location: Option<String>,
    dates: Vec<NaiveDate>,
    weekdays: Vec<String>,
    today: bool,
    timezone: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let timezone = resolve_timezone(timezone.as_deref(), &config.fetch.timezone)?;
    let events = storage::load_combined_events(file)
        .with_context(|| format!("failed to load snapshot '{}'", file))?;

    let filter = EventFilter::new(timezone);
    let criteria = FilterCriteria {
        location,
        dates,
        weekdays,
        today,
    };
    let matched = filter.apply(&events, &criteria);

    if json {
        let rendered: Vec<_> = matched.iter().map(|event| filter.render(event)).collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    println!("Filtered {} events matching criteria.", matched.len());
    for event in matched {
        let rendered = filter.render(event);
        println!(
            "- {} | Start: {} | City: {}",
            rendered.name,
            rendered.local_start.as_deref().unwrap_or("No start date"),
            rendered.city
        );
    }
    Ok(())
}

/// The configured timezone applies unless a flag overrides it.
fn resolve_timezone(flag: Option<&str>, config_timezone: &str) -> anyhow::Result<Tz> {
    let name = flag.unwrap_or(config_timezone);
    name.parse()
        .map_err(|_| anyhow!("unrecognized timezone '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_timezone_applies_without_flag() {
        let tz = resolve_timezone(None, "America/New_York").unwrap();
        assert_eq!(tz, chrono_tz::America::New_York);
    }

    #[test]
    fn test_timezone_flag_overrides_config() {
        let tz = resolve_timezone(Some("Europe/Berlin"), "America/New_York").unwrap();
        assert_eq!(tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_unrecognized_timezone_is_an_error() {
        assert!(resolve_timezone(None, "America/Nowhere").is_err());
    }
}
