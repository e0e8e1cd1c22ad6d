use crate::bounds::GeoBounds;
use crate::wrap::segment_visible;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn is_finite(&self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite()
    }

    pub fn shifted_lon(self, shift_deg: f64) -> Self {
        Self::new(self.lon_deg + shift_deg, self.lat_deg)
    }
}

/// Geometry kinds carried by overlay and label datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl Geometry {
    /// Copy of the geometry translated by `shift_deg` in longitude.
    ///
    /// Used to build the -360/+360 world copies; longitudes are not re-wrapped.
    pub fn shifted_lon(&self, shift_deg: f64) -> Geometry {
        let shift = |p: &GeoPoint| p.shifted_lon(shift_deg);
        let shift_line = |line: &Vec<GeoPoint>| line.iter().map(shift).collect::<Vec<_>>();
        match self {
            Geometry::Point(p) => Geometry::Point(shift(p)),
            Geometry::MultiPoint(ps) => Geometry::MultiPoint(ps.iter().map(shift).collect()),
            Geometry::LineString(line) => Geometry::LineString(shift_line(line)),
            Geometry::MultiLineString(lines) => {
                Geometry::MultiLineString(lines.iter().map(shift_line).collect())
            }
            Geometry::Polygon(rings) => Geometry::Polygon(rings.iter().map(shift_line).collect()),
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(shift_line).collect())
                    .collect(),
            ),
        }
    }

    /// Conservative visibility test against a (possibly unwrapped) viewport box.
    ///
    /// Points are tested directly, lines segment by segment and polygons by the
    /// bounding box of their outer ring, so an area that fully covers the view
    /// is still reported visible.
    pub fn intersects_bounds(&self, bounds: &GeoBounds) -> bool {
        match self {
            Geometry::Point(p) => bounds.contains(*p),
            Geometry::MultiPoint(ps) => ps.iter().any(|p| bounds.contains(*p)),
            Geometry::LineString(line) => line_visible(bounds, line),
            Geometry::MultiLineString(lines) => lines.iter().any(|l| line_visible(bounds, l)),
            Geometry::Polygon(rings) => rings_visible(bounds, rings),
            Geometry::MultiPolygon(polys) => polys.iter().any(|rings| rings_visible(bounds, rings)),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.len(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().map(Vec::len).sum()
            }
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .flat_map(|rings| rings.iter())
                .map(Vec::len)
                .sum(),
        }
    }
}

fn line_visible(bounds: &GeoBounds, line: &[GeoPoint]) -> bool {
    match line {
        [] => false,
        [only] => bounds.contains(*only),
        _ => line
            .windows(2)
            .any(|pair| segment_visible(bounds, pair[0], pair[1])),
    }
}

fn rings_visible(bounds: &GeoBounds, rings: &[Vec<GeoPoint>]) -> bool {
    rings
        .first()
        .and_then(|outer| GeoBounds::of_points(outer))
        .is_some_and(|bb| bb.intersects(bounds))
}
