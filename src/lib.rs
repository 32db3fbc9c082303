//! `StreetScout` - street-level imagery search and retrieval
//!
//! This library provides the core functionality for locating street-level
//! imagery inside a geographic region, downloading the photographs through
//! a bounded worker pool, and resolving their positions into addresses.

pub mod config;
pub mod error;
pub mod geocode;
pub mod mapillary;
pub mod models;

// Re-export core types for public API
pub use config::StreetScoutConfig;
pub use error::{Result, StreetScoutError};
pub use geocode::{AddressResolver, NominatimResolver};
pub use mapillary::{
    ImageFetcher, ImageResolution, ImageSearchService, MetadataClient, ProgressFn, SearchOptions,
};
pub use models::{BoundingBox, Geometry, ImagePosition, ImageRecord, Location};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
