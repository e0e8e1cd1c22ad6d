use std::f64::consts::PI;

use super::Vec2;
use crate::geometry::GeoPoint;

/// Latitude limit of the square Web Mercator world.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_78;

/// Default raster tile edge in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Geo <-> world-pixel mapping at a zoom level.
///
/// Implementations must not wrap longitudes: `project` of `lon + 360` lands one
/// world width to the east. Tile rendering and wrap copies depend on it.
pub trait Projection {
    fn project(&self, p: GeoPoint, zoom: f64) -> Vec2;
    fn unproject(&self, px: Vec2, zoom: f64) -> GeoPoint;

    /// World width in pixels at `zoom`.
    fn world_size_px(&self, zoom: f64) -> f64;
}

/// Spherical Web Mercator in the usual slippy-map pixel space: `(0, 0)` is the
/// north-west corner of the world at lon -180.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WebMercator {
    pub tile_size_px: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            tile_size_px: TILE_SIZE_PX,
        }
    }
}

impl Projection for WebMercator {
    fn project(&self, p: GeoPoint, zoom: f64) -> Vec2 {
        let size = self.world_size_px(zoom);
        let lat = p
            .lat_deg
            .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
            .to_radians();
        let sin = lat.sin();
        let x = (p.lon_deg + 180.0) / 360.0;
        let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI);
        Vec2::new(x * size, y * size)
    }

    fn unproject(&self, px: Vec2, zoom: f64) -> GeoPoint {
        let size = self.world_size_px(zoom);
        let lon = px.x / size * 360.0 - 180.0;
        let n = PI - 2.0 * PI * px.y / size;
        let lat = n.sinh().atan().to_degrees();
        GeoPoint::new(lon, lat)
    }

    fn world_size_px(&self, zoom: f64) -> f64 {
        self.tile_size_px * zoom.exp2()
    }
}

#[cfg(test)]
mod tests {
    use super::{MERCATOR_MAX_LAT_DEG, Projection, WebMercator};
    use crate::geometry::GeoPoint;
    use crate::math::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_world_center() {
        let proj = WebMercator::default();
        let px = proj.project(GeoPoint::new(0.0, 0.0), 0.0);
        assert_close(px.x, 128.0, 1e-9);
        assert_close(px.y, 128.0, 1e-9);
    }

    #[test]
    fn corners_of_the_world() {
        let proj = WebMercator::default();
        let nw = proj.unproject(Vec2::new(0.0, 0.0), 2.0);
        assert_close(nw.lon_deg, -180.0, 1e-9);
        assert_close(nw.lat_deg, MERCATOR_MAX_LAT_DEG, 1e-6);
    }

    #[test]
    fn longitudes_are_not_wrapped() {
        let proj = WebMercator::default();
        let a = proj.project(GeoPoint::new(10.0, 20.0), 3.0);
        let b = proj.project(GeoPoint::new(370.0, 20.0), 3.0);
        assert_close(b.x - a.x, proj.world_size_px(3.0), 1e-6);
        let back = proj.unproject(Vec2::new(-10.0, 100.0), 3.0);
        assert!(back.lon_deg < -180.0);
    }

    #[test]
    fn project_unproject_round_trip() {
        let proj = WebMercator::default();
        let p = GeoPoint::new(-73.5, 45.25);
        let q = proj.unproject(proj.project(p, 5.0), 5.0);
        assert_close(q.lon_deg, p.lon_deg, 1e-9);
        assert_close(q.lat_deg, p.lat_deg, 1e-9);
    }
}
