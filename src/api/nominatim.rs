use serde::Deserialize;
use std::thread;
use std::time::Duration;

use crate::config::NominatimConfig;
use crate::error::Error;

const USER_AGENT: &str = concat!("osmgrab/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

/// Geocode a free-text address to latitude/longitude coordinates.
///
/// One GET to the configured Nominatim search endpoint, best match only.
/// Includes a 1 second delay for rate limiting (Nominatim ToS).
///
/// # Arguments
/// * `config` - Nominatim endpoint and timeout
/// * `address` - Address to geocode (e.g., "Brussels, Belgium")
///
/// # Returns
/// * `Ok((lat, lon))` - Coordinates of the best match
/// * `Err(Error::Geocoding)` - If the service is unreachable or no match is found
pub fn geocode(config: &NominatimConfig, address: &str) -> Result<(f64, f64), Error> {
    // Rate limiting - Nominatim requires max 1 request per second
    thread::sleep(Duration::from_secs(1));

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Geocoding(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(&config.endpoint)
        .query(&[("q", address), ("format", "json"), ("limit", "1")])
        .send()
        .map_err(|e| Error::Geocoding(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Geocoding(format!(
            "Nominatim returned status {}",
            response.status()
        )));
    }

    let results: Vec<NominatimResult> = response
        .json()
        .map_err(|e| Error::Geocoding(format!("unexpected response body: {e}")))?;

    let best = results
        .into_iter()
        .next()
        .ok_or_else(|| Error::Geocoding(format!("no match for address: {address}")))?;

    let lat: f64 = best
        .lat
        .parse()
        .map_err(|_| Error::Geocoding(format!("unparseable latitude: {}", best.lat)))?;
    let lon: f64 = best
        .lon
        .parse()
        .map_err(|_| Error::Geocoding(format!("unparseable longitude: {}", best.lon)))?;

    Ok((lat, lon))
}
