use crate::bounds::GeoBounds;
use crate::geometry::GeoPoint;
use crate::math::{Projection, Vec2, WebMercator};

/// Current view of the host map: center, zoom and surface size.
///
/// Screen ("container") coordinates have their origin at the top-left corner of
/// the map surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub size_px: Vec2,
    pub projection: WebMercator,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64, size_px: Vec2) -> Self {
        Self {
            center,
            zoom,
            size_px,
            projection: WebMercator::default(),
        }
    }

    /// Integer zoom level used by every zoom-dependent rule.
    pub fn zoom_level(&self) -> i32 {
        self.zoom.round() as i32
    }

    /// World-pixel position of the top-left screen corner.
    pub fn pixel_origin(&self) -> Vec2 {
        self.projection.project(self.center, self.zoom) - self.size_px.scale(0.5)
    }

    pub fn geo_to_screen(&self, p: GeoPoint) -> Vec2 {
        self.projection.project(p, self.zoom) - self.pixel_origin()
    }

    pub fn screen_to_geo(&self, px: Vec2) -> GeoPoint {
        self.projection.unproject(px + self.pixel_origin(), self.zoom)
    }

    /// Geographic bounds of the visible surface; longitudes may exceed `±180`.
    pub fn bounds(&self) -> GeoBounds {
        let nw = self.screen_to_geo(Vec2::new(0.0, 0.0));
        let se = self.screen_to_geo(self.size_px);
        GeoBounds::from_corners(nw, se)
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.zoom.is_finite()
            && self.size_px.is_finite()
            && self.size_px.x > 0.0
            && self.size_px.y > 0.0
    }
}
