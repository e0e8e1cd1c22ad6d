use crate::geometry::GeoPoint;

/// Geographic bounding box in degrees.
///
/// Longitudes are *not* normalized: under world wrap a viewport or tile can span
/// e.g. `[170, 200]`, and callers rely on that to keep cells contiguous across the
/// antimeridian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// Smallest box containing both corners.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self::new(a.lon_deg, a.lat_deg, b.lon_deg, b.lat_deg)
    }

    /// Bounding box of a point list; `None` when empty or any coordinate is non-finite.
    pub fn of_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut out = Self::new(first.lon_deg, first.lat_deg, first.lon_deg, first.lat_deg);
        for p in points {
            if !p.is_finite() {
                return None;
            }
            out.west = out.west.min(p.lon_deg);
            out.east = out.east.max(p.lon_deg);
            out.south = out.south.min(p.lat_deg);
            out.north = out.north.max(p.lat_deg);
        }
        Some(out)
    }

    pub fn is_finite(&self) -> bool {
        self.west.is_finite() && self.south.is_finite() && self.east.is_finite() && self.north.is_finite()
    }

    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// Grows the box by `ratio` of its span on every side.
    pub fn padded(&self, ratio: f64) -> Self {
        let dx = self.width_deg() * ratio;
        let dy = self.height_deg() * ratio;
        Self {
            west: self.west - dx,
            south: self.south - dy,
            east: self.east + dx,
            north: self.north + dy,
        }
    }

    /// Inclusive containment.
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon_deg >= self.west
            && p.lon_deg <= self.east
            && p.lat_deg >= self.south
            && p.lat_deg <= self.north
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        !(other.east < self.west
            || other.west > self.east
            || other.north < self.south
            || other.south > self.north)
    }

    pub fn shifted_lon(&self, shift_deg: f64) -> Self {
        Self {
            west: self.west + shift_deg,
            east: self.east + shift_deg,
            ..*self
        }
    }
}

/// Axis-aligned pixel rectangle, `x1 <= x2`, `y1 <= y2`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(
            cx - width * 0.5,
            cy - height * 0.5,
            cx + width * 0.5,
            cy + height * 0.5,
        )
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &PixelRect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// True when no part of the rectangle lies inside `[0, w] x [0, h]`.
    pub fn is_outside(&self, w: f64, h: f64) -> bool {
        self.x2 < 0.0 || self.y2 < 0.0 || self.x1 > w || self.y1 > h
    }
}
