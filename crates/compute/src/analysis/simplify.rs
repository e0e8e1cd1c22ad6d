//! Screen-space polyline simplification for freehand lasso input.

use foundation::math::Vec2;
use geo::{Coord, LineString, Simplify};

/// Radial-distance reduction followed by Douglas-Peucker, both against
/// `tolerance_px`. Endpoints are always kept.
pub fn simplify_polyline(points: &[Vec2], tolerance_px: f64) -> Vec<Vec2> {
    if points.len() <= 2 || !(tolerance_px > 0.0) {
        return points.to_vec();
    }
    let reduced = reduce_radial(points, tolerance_px * tolerance_px);
    douglas_peucker(&reduced, tolerance_px)
}

/// Drops points closer than the tolerance to the previously kept point.
fn reduce_radial(points: &[Vec2], sq_tolerance: f64) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(points.len());
    let mut prev = points[0];
    out.push(prev);
    for &p in &points[1..] {
        if p.distance_sq(prev) > sq_tolerance {
            out.push(p);
            prev = p;
        }
    }
    let last = points[points.len() - 1];
    if prev != last {
        out.push(last);
    }
    out
}

fn douglas_peucker(points: &[Vec2], tolerance_px: f64) -> Vec<Vec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let line: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    line.simplify(&tolerance_px)
        .into_inner()
        .into_iter()
        .map(|c| Vec2::new(c.x, c.y))
        .collect()
}
