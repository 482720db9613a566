use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use osmgrab::api::{OverpassClient, geocode};
use osmgrab::bounds::{self, BoundingBox};
use osmgrab::config::FileConfig;
use osmgrab::convert::{GeometryKind, as_geojson};
use osmgrab::query;

/// Extract GeoJSON features from OpenStreetMap through the Overpass API
///
/// Examples:
///   # All fuel stations within 3km of an address
///   osmgrab --address "Brussels, Belgium" --buffer 3000 --tag amenity --values fuel --geom point fuel.geojson
///
///   # Primary and secondary roads around a point
///   osmgrab --latlon 50.85 4.35 --buffer 5000 --tag highway --values primary,secondary --geom linestring roads.geojson
///
///   # Buildings inside the extent of an existing GeoJSON file
///   osmgrab --fromfile area.geojson --tag building --geom polygon buildings.geojson
#[derive(Parser, Debug)]
#[command(name = "osmgrab")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("location").required(true).args(["fromfile", "latlon", "address"])))]
struct Args {
    /// Bounding box from the spatial extent of a GeoJSON or GPX file
    #[arg(long, value_name = "PATH")]
    fromfile: Option<PathBuf>,

    /// Space-separated lat/lon coordinates (use with --buffer)
    #[arg(long, num_args = 2, allow_hyphen_values = true, requires = "buffer")]
    latlon: Option<Vec<f64>>,

    /// Address to geocode (use with --buffer)
    #[arg(long, requires = "buffer")]
    address: Option<String>,

    /// Buffer size in meters around --latlon or --address
    #[arg(long, value_name = "METERS")]
    buffer: Option<f64>,

    /// OSM tag of interest (ex: "highway")
    #[arg(long)]
    tag: Option<String>,

    /// Comma-separated list of accepted values (ex: "tertiary,primary")
    #[arg(long, value_delimiter = ',', requires = "tag")]
    values: Option<Vec<String>>,

    /// Make the first character of each value case insensitive
    #[arg(long)]
    case_insensitive: bool,

    /// Output geometry type
    #[arg(long, value_enum)]
    geom: GeometryKind,

    /// Overpass API endpoint (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Overpass server-side timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout: Option<u64>,

    /// Path to config file (auto-searches osmgrab.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Output GeoJSON file path
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };

    let mut overpass_config = file_config
        .as_ref()
        .and_then(|c| c.overpass.clone())
        .unwrap_or_default();
    if let Some(endpoint) = args.endpoint.clone() {
        overpass_config.endpoint = endpoint;
    }
    if let Some(timeout) = args.timeout {
        overpass_config.timeout_secs = timeout;
    }
    let nominatim_config = file_config
        .as_ref()
        .and_then(|c| c.nominatim.clone())
        .unwrap_or_default();

    if args.verbose {
        println!("Configuration:");
        println!("  Overpass endpoint: {}", overpass_config.endpoint);
        println!("  Overpass timeout: {}s", overpass_config.timeout_secs);
        println!("  Geometry: {:?}", args.geom);
        println!("  Output: {}", args.output.display());
        println!();
    }

    let bounds = resolve_bounds(&args, &nominatim_config)?;
    if args.verbose {
        println!("  Bounds: {}", bounds);
    }

    let values = args.values.clone().unwrap_or_default();
    let osm_query = query::build(
        &bounds,
        args.tag.as_deref(),
        &values,
        args.case_insensitive,
        overpass_config.timeout_secs,
    );
    if args.verbose {
        println!("  Query: {}", osm_query);
    }

    let client = OverpassClient::new(&overpass_config)?;
    let spinner = create_spinner("Querying the Overpass API...");
    let start = Instant::now();
    let response = client
        .request(&osm_query)
        .context("Failed to fetch data from the Overpass API")?;
    spinner.finish_with_message(format!(
        "Fetched {} elements [{:.1}s]",
        response.elements.len(),
        start.elapsed().as_secs_f32()
    ));

    let conversion = as_geojson(&response, args.geom);
    if conversion.skipped > 0 {
        eprintln!(
            "Skipped {} elements with unresolvable geometry",
            conversion.skipped
        );
    }

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create output file: {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &conversion.collection)
        .context("Failed to serialize feature collection")?;
    writer.flush()?;

    println!(
        "Wrote {} features to {} [{:.1}s]",
        conversion.collection.features.len(),
        args.output.display(),
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

/// Turn the exclusive location options into a bounding box.
fn resolve_bounds(
    args: &Args,
    nominatim_config: &osmgrab::config::NominatimConfig,
) -> Result<BoundingBox> {
    if let Some(ref path) = args.fromfile {
        let spinner = create_spinner("Reading bounds from file...");
        let bounds = bounds::from_file(path)?;
        spinner.finish_with_message(format!("Bounds from {}: {}", path.display(), bounds));
        return Ok(bounds);
    }

    let buffer = args
        .buffer
        .context("--buffer is required with --latlon or --address")?;

    if let Some(ref latlon) = args.latlon {
        let (lat, lon) = (latlon[0], latlon[1]);
        return Ok(BoundingBox::from_point(lat, lon, buffer)?);
    }

    let address = args
        .address
        .as_ref()
        .context("One of --fromfile, --latlon or --address must be provided")?;
    let spinner = create_spinner("Geocoding address...");
    let start = Instant::now();
    let (lat, lon) = geocode(nominatim_config, address)?;
    spinner.finish_with_message(format!(
        "Geocoded: {} -> ({:.4}, {:.4}) [{:.1}s]",
        address,
        lat,
        lon,
        start.elapsed().as_secs_f32()
    ));
    Ok(BoundingBox::from_point(lat, lon, buffer)?)
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
