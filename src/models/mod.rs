//! Core data types for imagery search
//!
//! - Geographic coordinates with degree/DMS conversion and distance
//! - Rectangular search regions in longitude/latitude space
//! - Fetched photograph records and their geometry

pub mod location;
pub mod record;
pub mod region;

// Re-export commonly used types from submodules
pub use location::Location;
pub use record::{Geometry, ImagePosition, ImageRecord};
pub use region::BoundingBox;
