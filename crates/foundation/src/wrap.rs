//! Longitude wrapping and antimeridian helpers.

use crate::bounds::GeoBounds;
use crate::geometry::{GeoPoint, Geometry};

/// Longitude offsets of the rendered world copies, west to east.
pub const WORLD_COPIES: [f64; 3] = [-360.0, 0.0, 360.0];

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_lon(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Replicates a geometry at every offset in [`WORLD_COPIES`].
pub fn world_copies(geometry: &Geometry) -> [Geometry; 3] {
    WORLD_COPIES.map(|shift| geometry.shifted_lon(shift))
}

pub fn point_visible(bounds: &GeoBounds, p: GeoPoint) -> bool {
    bounds.contains(p)
}

/// Bounding-box test for a segment, both endpoints in the same unwrapped space.
pub fn segment_visible(bounds: &GeoBounds, a: GeoPoint, b: GeoPoint) -> bool {
    let min_x = a.lon_deg.min(b.lon_deg);
    let max_x = a.lon_deg.max(b.lon_deg);
    let min_y = a.lat_deg.min(b.lat_deg);
    let max_y = a.lat_deg.max(b.lat_deg);

    !(max_x < bounds.west || min_x > bounds.east || max_y < bounds.south || min_y > bounds.north)
}
