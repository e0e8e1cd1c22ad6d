use foundation::bounds::GeoBounds;
use foundation::geometry::GeoPoint;
use scene::grid::{CellIndex, GridModel};
use scene::selection::CellSelection;
use tracing::debug;

/// Substituted for a zero edge height so the crossing test never divides by zero.
const EDGE_EPSILON: f64 = 1e-12;

/// Even-odd ray casting in lon/lat space. The ring is implicitly closed.
pub fn point_in_polygon(point: GeoPoint, ring: &[GeoPoint]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let x = point.lon_deg;
    let y = point.lat_deg;

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lon_deg, ring[i].lat_deg);
        let (xj, yj) = (ring[j].lon_deg, ring[j].lat_deg);
        if (yi > y) != (yj > y) {
            let dy = if yj - yi == 0.0 { EDGE_EPSILON } else { yj - yi };
            if x < (xj - xi) * (y - yi) / dy + xi {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Cells whose center lies inside `polygon`.
///
/// The polygon lives in unwrapped longitude space (a lasso dragged across the
/// antimeridian can reach 200°), so each center is also tested at every `±360°`
/// copy that can fall inside the polygon's longitude range. Rings with fewer
/// than three usable points select nothing.
pub fn select_cells(grid: &GridModel, polygon: &[GeoPoint]) -> CellSelection {
    let mut out = CellSelection::for_grid(grid);
    let ring: Vec<GeoPoint> = polygon.iter().copied().filter(GeoPoint::is_finite).collect();
    if ring.len() < 3 {
        debug!(points = ring.len(), "degenerate selection polygon");
        return out;
    }
    let Some(bbox) = GeoBounds::of_points(&ring) else {
        return out;
    };

    let shifts = wrap_shifts(&bbox);
    for i in 0..grid.n_lat() {
        let row_lat = grid.cell_center(CellIndex::new(i, 0)).lat_deg;
        if row_lat < bbox.south || row_lat > bbox.north {
            continue;
        }
        for j in 0..grid.n_lon() {
            let cell = CellIndex::new(i, j);
            let center = grid.cell_center(cell);
            let hit = shifts.iter().any(|&shift| {
                let p = center.shifted_lon(shift);
                bbox.contains(p) && point_in_polygon(p, &ring)
            });
            if hit {
                out.insert(cell);
            }
        }
    }

    debug!(
        vertices = ring.len(),
        selected = out.len(),
        "selected cells inside polygon"
    );
    out
}

/// Longitude offsets (multiples of 360) that can move a center in `[-180, 180)`
/// into the box's longitude range.
fn wrap_shifts(bbox: &GeoBounds) -> Vec<f64> {
    let k_min = ((bbox.west - 180.0) / 360.0).floor() as i64;
    let k_max = ((bbox.east + 180.0) / 360.0).ceil() as i64;
    (k_min..=k_max).map(|k| k as f64 * 360.0).collect()
}
