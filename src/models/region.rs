//! Rectangular longitude/latitude regions for scoping metadata searches

use serde::{Deserialize, Serialize};

use crate::models::Location;

/// Rectangular area in longitude/latitude space.
///
/// `left`/`right` are longitudes and `bottom`/`top` are latitudes, all in
/// decimal degrees. Boxes exist only to build query strings; nothing stores
/// them long-term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    /// Build a box spanning `center ± radius` on each axis.
    ///
    /// `radius` carries the half-extent of the box as degree offsets in
    /// its latitude/longitude components.
    #[must_use]
    pub fn from_center_and_radius(center: &Location, radius: &Location) -> Self {
        Self {
            left: center.longitude_degrees() - radius.longitude_degrees(),
            bottom: center.latitude_degrees() - radius.latitude_degrees(),
            right: center.longitude_degrees() + radius.longitude_degrees(),
            top: center.latitude_degrees() + radius.latitude_degrees(),
        }
    }

    /// Build a box from explicit edges
    #[must_use]
    pub fn from_edges(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Render the `left,bottom,right,top` query fragment
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{},{},{}", self.left, self.bottom, self.right, self.top)
    }
}
