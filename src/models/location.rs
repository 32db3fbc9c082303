//! Geographic coordinate value type
//!
//! Locations are built only through named factories so latitude and
//! longitude cannot be swapped silently at a call site.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern for coordinate pairs like `49°23'44.39"N 8°35'58.07"E`
static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+)°(\d+)'(\d+(?:\.\d+)?)"([NS])\s+(\d+)°(\d+)'(\d+(?:\.\d+)?)"([EW])"#)
        .expect("DMS pattern must compile")
});

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude_degrees: f64,
    longitude_degrees: f64,
}

impl Location {
    /// Create a location from decimal degrees
    #[must_use]
    pub fn from_degrees(latitude_degrees: f64, longitude_degrees: f64) -> Self {
        Self {
            latitude_degrees,
            longitude_degrees,
        }
    }

    /// The (0°, 0°) location
    #[must_use]
    pub fn zero() -> Self {
        Self::from_degrees(0.0, 0.0)
    }

    /// Parse a display string like `49°23'44.39"N 8°35'58.07"E`.
    ///
    /// Returns `None` when the string does not contain a
    /// degrees-minutes-seconds pair with hemisphere letters.
    #[must_use]
    pub fn from_display_string(input: &str) -> Option<Self> {
        let captures = DMS_PATTERN.captures(input)?;
        let latitude =
            dms_to_decimal_degrees(&captures[1], &captures[2], &captures[3], &captures[4])?;
        let longitude =
            dms_to_decimal_degrees(&captures[5], &captures[6], &captures[7], &captures[8])?;
        Some(Self::from_degrees(latitude, longitude))
    }

    /// Latitude in decimal degrees
    #[must_use]
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude_degrees
    }

    /// Longitude in decimal degrees
    #[must_use]
    pub fn longitude_degrees(&self) -> f64 {
        self.longitude_degrees
    }

    /// Raw (latitude, longitude) pair in decimal degrees
    #[must_use]
    pub fn coordinates_degrees(&self) -> (f64, f64) {
        (self.latitude_degrees, self.longitude_degrees)
    }

    /// Format as degrees-minutes-seconds with hemisphere letters.
    ///
    /// Magnitudes are always non-negative; the sign of each coordinate
    /// picks the hemisphere letter (positive is N/E).
    #[must_use]
    pub fn to_display_string(&self) -> String {
        let (lat_positive, lat_deg, lat_min, lat_sec) = unsigned_dms(self.latitude_degrees);
        let (lon_positive, lon_deg, lon_min, lon_sec) = unsigned_dms(self.longitude_degrees);
        format!(
            "{:.0}°{:.0}'{:.2}\"{} {:.0}°{:.0}'{:.2}\"{}",
            lat_deg,
            lat_min,
            lat_sec,
            if lat_positive { 'N' } else { 'S' },
            lon_deg,
            lon_min,
            lon_sec,
            if lon_positive { 'E' } else { 'W' },
        )
    }

    /// Great-circle distance to another location in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude_degrees,
                longitude: self.longitude_degrees,
            },
            haversine::Location {
                latitude: other.latitude_degrees,
                longitude: other.longitude_degrees,
            },
            haversine::Units::Kilometers,
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// Decompose decimal degrees into (positive, degrees, minutes, seconds)
fn unsigned_dms(decimal_degrees: f64) -> (bool, f64, f64, f64) {
    let positive = decimal_degrees > 0.0;
    let total_seconds = decimal_degrees.abs() * 3600.0;
    let total_minutes = (total_seconds / 60.0).floor();
    let seconds = total_seconds - total_minutes * 60.0;
    let degrees = (total_minutes / 60.0).floor();
    let minutes = total_minutes - degrees * 60.0;
    (positive, degrees, minutes, seconds)
}

/// Recompose decimal degrees, negated for southern/western hemispheres
fn dms_to_decimal_degrees(
    degrees: &str,
    minutes: &str,
    seconds: &str,
    direction: &str,
) -> Option<f64> {
    let degrees: f64 = degrees.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    Some(match direction {
        "S" | "W" => -magnitude,
        _ => magnitude,
    })
}
