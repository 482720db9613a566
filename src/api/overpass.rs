use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::OverpassConfig;
use crate::error::Error;

const USER_AGENT: &str = concat!("osmgrab/", env!("CARGO_PKG_VERSION"));

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub nodes: Option<Vec<u64>>,
    #[serde(default)]
    pub members: Option<Vec<Member>>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

/// A relation member reference, tagged with its role ("outer"/"inner")
#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "ref")]
    pub ref_: u64,
    #[serde(default)]
    pub role: String,
}

/// Synchronous Overpass API client.
///
/// Holds the endpoint and timeout explicitly; construct one per run and
/// pass it along instead of relying on process-global state.
#[derive(Debug)]
pub struct OverpassClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            // Client timeout slightly higher than the server-side [timeout:]
            .timeout(Duration::from_secs(config.timeout_secs + 5))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// Send one query to the Overpass API.
    ///
    /// Overpass expects form-encoded POST data: `data=<query>`. Exactly one
    /// request per call: no retry, rate limiting or pagination.
    ///
    /// # Errors
    /// * `Error::OverpassSyntax` - the server rejected the query (HTTP 400)
    /// * `Error::Transport` - network failure, any other non-success status,
    ///   or a body that is not valid JSON
    pub fn request(&self, query: &str) -> Result<OverpassResponse, Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

        match response.status().as_u16() {
            200 => response
                .json()
                .map_err(|e| Error::Transport(format!("invalid JSON body: {e}"))),
            400 => Err(Error::OverpassSyntax),
            status => Err(Error::Transport(format!(
                "Overpass returned status {status}"
            ))),
        }
    }
}
