use serde::Deserialize;
use std::path::PathBuf;

fn default_overpass_endpoint() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_timeout() -> u64 {
    25
}

fn default_nominatim_endpoint() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_nominatim_timeout() -> u64 {
    30
}

/// Optional TOML configuration, merged under CLI flags.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub overpass: Option<OverpassConfig>,
    #[serde(default)]
    pub nominatim: Option<NominatimConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_endpoint")]
    pub endpoint: String,
    /// Server-side `[timeout:]` in seconds; the HTTP client allows slightly
    /// more so the server gets the chance to answer first.
    #[serde(default = "default_overpass_timeout")]
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: default_overpass_endpoint(),
            timeout_secs: default_overpass_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NominatimConfig {
    #[serde(default = "default_nominatim_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_nominatim_timeout")]
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            endpoint: default_nominatim_endpoint(),
            timeout_secs: default_nominatim_timeout(),
        }
    }
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("osmgrab.toml"));
    paths.push(PathBuf::from(".osmgrab.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("osmgrab").join("config.toml"));
        paths.push(config_dir.join("osmgrab.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".osmgrab.toml"));
        paths.push(home.join(".config").join("osmgrab").join("config.toml"));
    }

    paths
}
