use std::env;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use streetscout::{
    AddressResolver, BoundingBox, ImagePosition, ImageSearchService, Location, NominatimResolver,
    SearchOptions, StreetScoutConfig,
};

const USAGE: &str =
    "Usage: streetscout <access-token> [latitude longitude [radius-degrees]] [--addresses]";

// Somewhere in Antwerp, Belgium
const DEFAULT_CENTER: (f64, f64) = (51.154_366_9, 4.443_667_6);
const DEFAULT_RADIUS_DEGREES: f64 = 0.000_25;

#[tokio::main]
async fn main() -> Result<()> {
    let arguments: Vec<String> = env::args().skip(1).collect();

    if arguments.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let resolve_addresses = arguments.iter().any(|a| a == "--addresses");
    let positional: Vec<&String> = arguments.iter().filter(|a| !a.starts_with("--")).collect();

    let Some(token) = positional.first() else {
        bail!("{USAGE}");
    };

    let mut config = StreetScoutConfig::load().context("Failed to load configuration")?;
    config.api.token = Some((*token).clone());

    init_tracing(&config.logging.level);

    let (center, radius) = parse_region(&positional[1..])?;
    let region = BoundingBox::from_center_and_radius(&center, &radius);

    let service = ImageSearchService::new(&config)?;

    let mut options = SearchOptions::new()
        .with_batch_size(config.fetch.batch_size)
        .with_progress(|done, total| eprintln!("Fetched {done}/{total} images"));
    options.parallel_fetches = config.fetch.parallel_fetches;
    options.parallel_searches = config.fetch.parallel_searches;

    let records = service.search(&region, &options).await?;
    println!("Total images: {}", records.len());

    let resolver = if resolve_addresses {
        Some(NominatimResolver::new(&config)?)
    } else {
        None
    };

    for (index, record) in records.iter().enumerate() {
        let (width, height) = record.dimensions();
        let place = describe_position(record.position(), resolver.as_ref()).await;
        println!("{index}: {width}x{height} {place}");
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parse the optional region arguments into (center, radius).
///
/// Accepts decimal degrees (`51.15 4.44 [0.001]`) or a single
/// degrees-minutes-seconds string (`51°9'15.72"N 4°26'37.20"E`).
fn parse_region(arguments: &[&String]) -> Result<(Location, Location)> {
    let default_radius = Location::from_degrees(DEFAULT_RADIUS_DEGREES, DEFAULT_RADIUS_DEGREES);

    match arguments {
        [] => Ok((
            Location::from_degrees(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            default_radius,
        )),
        [display] => {
            let center = Location::from_display_string(display)
                .with_context(|| format!("Unrecognized coordinate string '{display}'"))?;
            Ok((center, default_radius))
        }
        [latitude, longitude] => {
            let center = parse_center(latitude, longitude)?;
            Ok((center, default_radius))
        }
        [latitude, longitude, radius] => {
            let center = parse_center(latitude, longitude)?;
            let radius_degrees: f64 = radius
                .parse()
                .with_context(|| format!("Radius '{radius}' must be a number in degrees"))?;
            Ok((
                center,
                Location::from_degrees(radius_degrees, radius_degrees),
            ))
        }
        _ => bail!("Too many arguments.\n{USAGE}"),
    }
}

fn parse_center(latitude: &str, longitude: &str) -> Result<Location> {
    let latitude: f64 = latitude
        .parse()
        .with_context(|| format!("Latitude '{latitude}' must be a number in degrees"))?;
    let longitude: f64 = longitude
        .parse()
        .with_context(|| format!("Longitude '{longitude}' must be a number in degrees"))?;
    Ok(Location::from_degrees(latitude, longitude))
}

async fn describe_position(
    position: ImagePosition,
    resolver: Option<&NominatimResolver>,
) -> String {
    match position {
        ImagePosition::Unknown => "unknown location".to_string(),
        ImagePosition::Point(location) => {
            if let Some(resolver) = resolver {
                match resolver.reverse_geocode(&location).await {
                    Ok(address) => return address,
                    Err(e) => tracing::warn!("Reverse geocoding failed: {}", e),
                }
            }
            location.to_display_string()
        }
    }
}
