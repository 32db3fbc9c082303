//! Fetched photograph records and their geometry

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use image::DynamicImage;
use serde::Deserialize;

use crate::models::Location;

/// GeoJSON-style geometry attached to an image record
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// GeoJSON type tag, e.g. `Point`
    #[serde(rename = "type")]
    pub kind: String,
    /// Position as `[longitude, latitude]` when the geometry is a point.
    /// Non-point shapes nest their coordinate arrays; those come out empty.
    #[serde(default, deserialize_with = "point_coordinates")]
    pub coordinates: Vec<f64>,
}

/// Accept only a flat numeric coordinate pair; anything else is empty
fn point_coordinates<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|entries| entries.iter().filter_map(serde_json::Value::as_f64).collect())
        .unwrap_or_default())
}

/// Position extracted from a record's geometry.
///
/// `Unknown` marks geometries that are not points, so a missing position
/// is never confusable with the real coordinate (0°, 0°).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePosition {
    Point(Location),
    Unknown,
}

impl ImagePosition {
    /// The contained location, if any
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            ImagePosition::Point(location) => Some(*location),
            ImagePosition::Unknown => None,
        }
    }
}

/// One fetched street-level photograph with its metadata
#[derive(Clone)]
pub struct ImageRecord {
    /// Provider-assigned identifier
    pub id: String,
    /// URL the image bytes were fetched from
    pub url: String,
    /// Decoded image payload
    pub image: DynamicImage,
    /// Capture timestamp in epoch milliseconds, as delivered by the provider
    pub captured_at_ms: Option<i64>,
    /// Geometry reported for the image
    pub geometry: Geometry,
}

impl ImageRecord {
    /// The decoded photograph
    #[must_use]
    pub fn picture(&self) -> &DynamicImage {
        &self.image
    }

    /// Pixel dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Position tagged by geometry type
    #[must_use]
    pub fn position(&self) -> ImagePosition {
        if self.geometry.kind != "Point" {
            return ImagePosition::Unknown;
        }
        let (Some(&longitude), Some(&latitude)) = (
            self.geometry.coordinates.first(),
            self.geometry.coordinates.get(1),
        ) else {
            return ImagePosition::Unknown;
        };
        ImagePosition::Point(Location::from_degrees(latitude, longitude))
    }

    /// Capture time as UTC, when the provider reported a timestamp
    #[must_use]
    pub fn captured_time(&self) -> Option<DateTime<Utc>> {
        self.captured_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

// The decoded payload is megabytes of pixels; show its dimensions instead
impl fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRecord")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("dimensions", &self.dimensions())
            .field("captured_at_ms", &self.captured_at_ms)
            .field("geometry", &self.geometry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_geometry(geometry: Geometry) -> ImageRecord {
        ImageRecord {
            id: "1234567890".to_string(),
            url: "https://example.com/thumb.jpg".to_string(),
            image: DynamicImage::new_rgba8(4, 2),
            captured_at_ms: Some(1_563_822_698_000),
            geometry,
        }
    }

    #[test]
    fn test_point_geometry_yields_location() {
        let record = record_with_geometry(Geometry {
            kind: "Point".to_string(),
            coordinates: vec![4.443_667_6, 51.154_366_9],
        });

        let ImagePosition::Point(location) = record.position() else {
            panic!("expected a point position");
        };
        // GeoJSON order is [longitude, latitude]
        assert!((location.latitude_degrees() - 51.154_366_9).abs() < 1e-9);
        assert!((location.longitude_degrees() - 4.443_667_6).abs() < 1e-9);
    }

    #[test]
    fn test_non_point_geometry_is_unknown() {
        let record = record_with_geometry(Geometry {
            kind: "LineString".to_string(),
            coordinates: vec![4.0, 51.0],
        });
        assert_eq!(record.position(), ImagePosition::Unknown);
        assert!(record.position().location().is_none());
    }

    #[test]
    fn test_point_with_missing_coordinates_is_unknown() {
        let record = record_with_geometry(Geometry {
            kind: "Point".to_string(),
            coordinates: vec![],
        });
        assert_eq!(record.position(), ImagePosition::Unknown);
    }

    #[test]
    fn test_geometry_deserializes_from_geojson() {
        let geometry: Geometry =
            serde_json::from_str(r#"{"type":"Point","coordinates":[8.599464,49.395664]}"#)
                .expect("geometry should deserialize");
        assert_eq!(geometry.kind, "Point");
        assert_eq!(geometry.coordinates, vec![8.599_464, 49.395_664]);
    }

    #[test]
    fn test_nested_coordinates_deserialize_as_empty() {
        // LineString coordinates are an array of pairs; the record must
        // still parse and report its position as unknown
        let geometry: Geometry = serde_json::from_str(
            r#"{"type":"LineString","coordinates":[[4.44,51.15],[4.45,51.16]]}"#,
        )
        .expect("non-point geometry should still deserialize");
        assert_eq!(geometry.kind, "LineString");
        assert!(geometry.coordinates.is_empty());
        assert_eq!(record_with_geometry(geometry).position(), ImagePosition::Unknown);
    }

    #[test]
    fn test_captured_time_conversion() {
        let record = record_with_geometry(Geometry {
            kind: "Point".to_string(),
            coordinates: vec![0.0, 0.0],
        });
        let captured = record.captured_time().expect("timestamp should convert");
        assert_eq!(captured.timestamp_millis(), 1_563_822_698_000);

        let mut without_timestamp = record;
        without_timestamp.captured_at_ms = None;
        assert!(without_timestamp.captured_time().is_none());
    }

    #[test]
    fn test_dimensions() {
        let record = record_with_geometry(Geometry {
            kind: "Point".to_string(),
            coordinates: vec![0.0, 0.0],
        });
        assert_eq!(record.dimensions(), (4, 2));
        assert_eq!(record.picture().width(), 4);
    }
}
