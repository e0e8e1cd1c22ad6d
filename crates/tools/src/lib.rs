//! File-facing helpers for the `thermap` binary. Everything that touches the
//! filesystem or stdout formats lives here, not in the library crates.

use std::fs;
use std::path::{Path, PathBuf};

use controller::{ConfigError, StartupError};
use formats::geojson::{FeatureCollection, GeoJsonError};
use foundation::geometry::GeoPoint;
use foundation::math::{Projection, Vec2, WebMercator};
use foundation::viewport::Viewport;
use layers::colormap::Rgb;
use layers::labels::LabelPlacement;
use layers::temperature::TileCoord;
use serde_json::{Value, json};

#[derive(Debug)]
pub enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    GeoJson { path: PathBuf, source: GeoJsonError },
    Config(ConfigError),
    Startup(StartupError),
    Arg(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            CliError::GeoJson { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            CliError::Config(e) => write!(f, "{e}"),
            CliError::Startup(e) => write!(f, "{e}"),
            CliError::Arg(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        CliError::Config(value)
    }
}

impl From<StartupError> for CliError {
    fn from(value: StartupError) -> Self {
        CliError::Startup(value)
    }
}

pub fn load_collection(path: &Path) -> Result<FeatureCollection, CliError> {
    let payload = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let collection = FeatureCollection::from_geojson_str(&payload).map_err(|source| CliError::GeoJson {
        path: path.to_path_buf(),
        source,
    })?;
    if collection.skipped > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = collection.skipped,
            "some features could not be read"
        );
    }
    Ok(collection)
}

/// `"LAT,LON"` in degrees.
pub fn parse_center(s: &str) -> Result<GeoPoint, CliError> {
    let (lat, lon) = split_pair(s, ',')?;
    Ok(GeoPoint::new(lon, lat))
}

/// `"WxH"` in pixels.
pub fn parse_size(s: &str) -> Result<Vec2, CliError> {
    let (w, h) = split_pair(s, 'x')?;
    if !(w > 0.0 && h > 0.0) {
        return Err(CliError::Arg(format!("size must be positive: {s}")));
    }
    Ok(Vec2::new(w, h))
}

fn split_pair(s: &str, sep: char) -> Result<(f64, f64), CliError> {
    let bad = || CliError::Arg(format!("expected two numbers separated by '{sep}': {s}"));
    let (a, b) = s.split_once(sep).ok_or_else(bad)?;
    let a: f64 = a.trim().parse().map_err(|_| bad())?;
    let b: f64 = b.trim().parse().map_err(|_| bad())?;
    if !a.is_finite() || !b.is_finite() {
        return Err(bad());
    }
    Ok((a, b))
}

/// Viewport showing exactly one tile.
pub fn tile_viewport(coord: TileCoord, tile_size_px: f64) -> Viewport {
    let projection = WebMercator { tile_size_px };
    let center_px = Vec2::new(
        (coord.x as f64 + 0.5) * tile_size_px,
        (coord.y as f64 + 0.5) * tile_size_px,
    );
    let center = projection.unproject(center_px, coord.z as f64);
    let mut viewport = Viewport::new(center, coord.z as f64, Vec2::new(tile_size_px, tile_size_px));
    viewport.projection = projection;
    viewport
}

/// Binary PPM (P6) of an RGBA buffer composited over `background`.
pub fn encode_ppm(size: u32, rgba: &[u8], background: Rgb) -> Vec<u8> {
    let mut out = format!("P6\n{size} {size}\n255\n").into_bytes();
    out.reserve(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = px[3] as f64 / 255.0;
        let blend = |c: u8, bg: u8| (c as f64 * a + bg as f64 * (1.0 - a)).round() as u8;
        out.push(blend(px[0], background.r));
        out.push(blend(px[1], background.g));
        out.push(blend(px[2], background.b));
    }
    out
}

pub fn placement_json(placement: &LabelPlacement) -> Value {
    let labels: Vec<Value> = placement
        .labels
        .iter()
        .map(|l| {
            json!({
                "name": l.name,
                "sovereign_key": l.sovereign_key,
                "rank": l.rank,
                "lon": l.position.lon_deg,
                "lat": l.position.lat_deg,
                "x": l.screen_px.x,
                "y": l.screen_px.y,
                "bbox": [l.bbox.x1, l.bbox.y1, l.bbox.x2, l.bbox.y2],
                "world_copy": l.world_copy,
            })
        })
        .collect();
    json!({
        "placed": placement.labels.len(),
        "considered": placement.considered,
        "capped": placement.capped,
        "labels": labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers::labels::PlacedLabel;
    use foundation::bounds::PixelRect;

    #[test]
    fn parses_center_and_size() {
        let c = parse_center("46.5, 2.0").unwrap();
        assert_eq!((c.lat_deg, c.lon_deg), (46.5, 2.0));
        let s = parse_size("800x600").unwrap();
        assert_eq!((s.x, s.y), (800.0, 600.0));
        assert!(parse_size("0x600").is_err());
        assert!(parse_center("46.5").is_err());
        assert!(parse_center("a,b").is_err());
    }

    #[test]
    fn tile_viewport_is_centered_on_the_tile() {
        let vp = tile_viewport(TileCoord::new(1, 1, 1), 256.0);
        let b = vp.bounds();
        assert!((b.west - 0.0).abs() < 1e-9);
        assert!((b.east - 180.0).abs() < 1e-9);
        assert!(b.north.abs() < 1e-9);
    }

    #[test]
    fn ppm_composites_over_background() {
        let rgba = [255, 0, 0, 255, 0, 0, 0, 0, 0, 0, 255, 128, 0, 0, 0, 0];
        let ppm = encode_ppm(2, &rgba, Rgb::new(255, 255, 255));
        let header = b"P6\n2 2\n255\n";
        assert_eq!(&ppm[..header.len()], header);
        let body = &ppm[header.len()..];
        assert_eq!(body.len(), 12);
        assert_eq!(&body[0..3], &[255, 0, 0]);
        assert_eq!(&body[3..6], &[255, 255, 255]);
        assert_eq!(&body[6..9], &[127, 127, 255]);
    }

    #[test]
    fn placement_serializes_labels() {
        let placement = LabelPlacement {
            labels: vec![PlacedLabel {
                name: "France".into(),
                sovereign_key: "FRA".into(),
                rank: 2.0,
                position: GeoPoint::new(2.0, 46.0),
                screen_px: Vec2::new(10.0, 20.0),
                bbox: PixelRect::new(0.0, 0.0, 20.0, 40.0),
                world_copy: 0.0,
            }],
            considered: 3,
            capped: false,
        };
        let v = placement_json(&placement);
        assert_eq!(v["placed"], 1);
        assert_eq!(v["labels"][0]["name"], "France");
        assert_eq!(v["labels"][0]["bbox"][3], 40.0);
    }
}
