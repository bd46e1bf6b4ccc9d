use serde::Deserialize;
use tracing::{info, warn};

const IPINFO_URL: &str = "https://ipinfo.io";

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

/// Detect the reference location from the caller's IP via ipinfo.io,
/// as "City, Region, Country" degrading to whatever parts are present.
/// Detection failure is not an error; the caller decides whether a
/// missing location is fatal.
pub async fn detect_reference_location(client: &reqwest::Client) -> Option<String> {
    info!("detecting reference location from IP");

    let response = match client.get(IPINFO_URL).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("location detection request failed: {}", e);
            return None;
        }
    };

    let ipinfo: IpInfoResponse = match response.json().await {
        Ok(ipinfo) => ipinfo,
        Err(e) => {
            warn!("location detection response was malformed: {}", e);
            return None;
        }
    };

    let location = format_location(&ipinfo)?;
    info!(location = %location, "detected reference location");
    Some(location)
}

fn format_location(ipinfo: &IpInfoResponse) -> Option<String> {
    let parts: Vec<&str> = [
        ipinfo.city.as_deref(),
        ipinfo.region.as_deref(),
        ipinfo.country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        return None;
    }
    Some(parts.join(", "))
}
