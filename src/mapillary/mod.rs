//! Mapillary Graph API integration
//!
//! This module provides the clients for street-level imagery retrieval:
//! - Bounding-box identifier search against the Graph API
//! - Two-step image fetch (metadata lookup, then byte download)
//! - Search orchestration with a bounded concurrent worker pool

pub mod fetcher;
pub mod metadata;
pub mod search;

// Re-export commonly used types from submodules
pub use fetcher::{ImageFetcher, ImageResolution};
pub use metadata::MetadataClient;
pub use search::{ImageSearchService, ProgressFn, SearchOptions};
