use foundation::bounds::{GeoBounds, PixelRect};
use foundation::geometry::GeoPoint;
use foundation::math::{Projection, TILE_SIZE_PX, Vec2, WebMercator};
use foundation::viewport::Viewport;
use scene::grid::{CellIndex, GridModel};
use tracing::trace;

use crate::colormap::{ColorGradient, Rgb};
use crate::layer::{Layer, LayerId, LayerKind};
use crate::symbology::LayerStyle;

/// Slippy-map tile address. `x` is not wrapped: tiles east or west of the
/// primary world copy carry `x` outside `[0, 2^z)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i64, y: i64, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// One grid cell drawn into a tile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CellFill {
    pub cell: CellIndex,
    /// Tile-local pixels; may extend past the tile edge.
    pub rect: PixelRect,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileRaster {
    pub coord: TileCoord,
    pub size_px: u32,
    pub bounds: GeoBounds,
    pub fills: Vec<CellFill>,
}

impl TileRaster {
    fn empty(coord: TileCoord, size_px: u32, bounds: GeoBounds) -> Self {
        Self {
            coord,
            size_px,
            bounds,
            fills: Vec::new(),
        }
    }

    /// RGBA8 buffer, row-major from the top-left. A pixel takes the color of the
    /// fill containing its center; uncovered pixels stay transparent.
    pub fn to_rgba(&self, opacity: f32) -> Vec<u8> {
        let size = self.size_px as usize;
        let mut buf = vec![0u8; size * size * 4];
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;

        for fill in &self.fills {
            let (x0, x1) = pixel_span(fill.rect.x1, fill.rect.x2, size);
            let (y0, y1) = pixel_span(fill.rect.y1, fill.rect.y2, size);
            for y in y0..y1 {
                let row = y * size;
                for x in x0..x1 {
                    let o = (row + x) * 4;
                    buf[o] = fill.color.r;
                    buf[o + 1] = fill.color.g;
                    buf[o + 2] = fill.color.b;
                    buf[o + 3] = alpha;
                }
            }
        }
        buf
    }
}

/// Pixel indices whose centers lie in `[lo, hi)`, clipped to `[0, size)`.
fn pixel_span(lo: f64, hi: f64, size: usize) -> (usize, usize) {
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().max(0.0);
    let start = (start as usize).min(size);
    let end = (end as usize).min(size);
    (start, end.max(start))
}

/// Geographic box covered by a tile; longitudes stay unwrapped.
pub fn tile_geo_bounds<P: Projection>(projection: &P, coord: TileCoord, tile_size_px: f64) -> GeoBounds {
    let zoom = coord.z as f64;
    let origin = Vec2::new(coord.x as f64 * tile_size_px, coord.y as f64 * tile_size_px);
    let nw = projection.unproject(origin, zoom);
    let se = projection.unproject(origin + Vec2::new(tile_size_px, tile_size_px), zoom);
    GeoBounds::from_corners(nw, se)
}

/// Rasterizes the cells intersecting one tile.
///
/// Column indices are computed in unwrapped space straight from the tile bounds
/// and only wrapped for the value lookup, so a tile past the antimeridian gets
/// contiguous cells with no seam.
pub fn render_tile<P: Projection>(
    grid: &GridModel,
    gradient: &ColorGradient,
    projection: &P,
    coord: TileCoord,
    tile_size_px: f64,
) -> TileRaster {
    let size_px = tile_size_px.max(1.0) as u32;
    let bounds = tile_geo_bounds(projection, coord, tile_size_px);
    if !bounds.is_finite() {
        return TileRaster::empty(coord, size_px, bounds);
    }

    let zoom = coord.z as f64;
    let origin = Vec2::new(coord.x as f64 * tile_size_px, coord.y as f64 * tile_size_px);
    let config = grid.config();

    let i0 = grid.clamp_row(((bounds.south + 90.0) / config.d_lat_deg).floor() as i64);
    let i1 = grid.clamp_row(((bounds.north + 90.0) / config.d_lat_deg).floor() as i64);
    let j_start = ((bounds.west + 180.0) / config.d_lon_deg).floor() as i64;
    let j_end = ((bounds.east + 180.0) / config.d_lon_deg).floor() as i64;

    let mut fills = Vec::new();
    for i in i0..=i1 {
        let lat0 = -90.0 + i as f64 * config.d_lat_deg;
        let lat1 = lat0 + config.d_lat_deg;
        let y0 = projection.project(GeoPoint::new(0.0, lat0), zoom).y - origin.y;
        let y1 = projection.project(GeoPoint::new(0.0, lat1), zoom).y - origin.y;

        for ju in j_start..=j_end {
            let lon0 = -180.0 + ju as f64 * config.d_lon_deg;
            let lon1 = lon0 + config.d_lon_deg;
            let cell = CellIndex::new(i, grid.wrap_column(ju));
            let Some(value) = grid.get(cell) else {
                continue;
            };

            let x0 = projection.project(GeoPoint::new(lon0, 0.0), zoom).x - origin.x;
            let x1 = projection.project(GeoPoint::new(lon1, 0.0), zoom).x - origin.x;

            fills.push(CellFill {
                cell,
                rect: PixelRect::new(x0, y0, x1, y1),
                color: gradient.value_to_color(value),
            });
        }
    }

    trace!(
        z = coord.z,
        x = coord.x,
        y = coord.y,
        cells = fills.len(),
        "rasterized temperature tile"
    );
    TileRaster {
        coord,
        size_px,
        bounds,
        fills,
    }
}

/// Tile layer over the grid.
///
/// Keeps no per-cell raster; it remembers only which grid generation it last
/// drew so the host knows when every visible tile must be redrawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TempFieldLayer {
    id: LayerId,
    pub style: LayerStyle,
    pub gradient: ColorGradient,
    pub projection: WebMercator,
    drawn_generation: Option<u64>,
}

impl TempFieldLayer {
    pub fn new(id: u64, gradient: ColorGradient) -> Self {
        Self {
            id: LayerId(id),
            style: LayerStyle::new(true, 0.70),
            gradient,
            projection: WebMercator::default(),
            drawn_generation: None,
        }
    }

    pub fn tile_size_px(&self) -> f64 {
        self.projection.tile_size_px
    }

    pub fn render_tile(&mut self, grid: &GridModel, coord: TileCoord) -> TileRaster {
        self.drawn_generation = Some(grid.generation());
        render_tile(
            grid,
            &self.gradient,
            &self.projection,
            coord,
            self.projection.tile_size_px,
        )
    }

    /// RGBA pixels for a tile with the layer opacity applied.
    pub fn render_tile_rgba(&mut self, grid: &GridModel, coord: TileCoord) -> Vec<u8> {
        let opacity = if self.style.visible { self.style.opacity } else { 0.0 };
        self.render_tile(grid, coord).to_rgba(opacity)
    }

    /// True when tiles on screen were drawn from an older grid state.
    pub fn needs_redraw(&self, grid: &GridModel) -> bool {
        self.drawn_generation
            .is_some_and(|g| g != grid.generation())
    }
}

impl Default for TempFieldLayer {
    fn default() -> Self {
        Self::new(1, ColorGradient::temperature())
    }
}

impl Layer for TempFieldLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::TemperatureField
    }
}

/// Tiles needed to cover a viewport at its integer zoom, west to east then
/// north to south. `x` stays unwrapped.
pub fn visible_tiles(viewport: &Viewport) -> Vec<TileCoord> {
    let z = viewport.zoom_level();
    let tile = TILE_SIZE_PX;
    let scale = (z as f64 - viewport.zoom).exp2();
    let origin = viewport.pixel_origin().scale(scale);
    let far = origin + viewport.size_px.scale(scale);
    let n = 1i64 << z.clamp(0, 30);

    let x0 = (origin.x / tile).floor() as i64;
    let x1 = ((far.x / tile).ceil() as i64 - 1).max(x0);
    let y0 = ((origin.y / tile).floor() as i64).max(0);
    let y1 = ((far.y / tile).ceil() as i64 - 1).min(n - 1);

    let mut out = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            out.push(TileCoord::new(x, y, z));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{TempFieldLayer, TileCoord, render_tile, tile_geo_bounds, visible_tiles};
    use crate::colormap::{ColorGradient, Rgb};
    use foundation::geometry::GeoPoint;
    use foundation::math::{Vec2, WebMercator};
    use foundation::viewport::Viewport;
    use scene::grid::{CellIndex, GridConfig, GridModel};

    const YELLOW: Rgb = Rgb::new(0xff, 0xff, 0xbf);

    fn grid(value: f64) -> GridModel {
        GridModel::filled(GridConfig::default(), value).unwrap()
    }

    #[test]
    fn tile_bounds_follow_the_projection() {
        let b = tile_geo_bounds(&WebMercator::default(), TileCoord::new(1, 0, 1), 256.0);
        assert!((b.west - 0.0).abs() < 1e-9);
        assert!((b.east - 180.0).abs() < 1e-9);
        assert!(b.south.abs() < 1e-9);
        assert!(b.north > 85.0);
    }

    #[test]
    fn fills_cover_intersecting_cells_with_mapped_colors() {
        let g = grid(15.0);
        let raster = render_tile(
            &g,
            &ColorGradient::temperature(),
            &WebMercator::default(),
            TileCoord::new(1, 0, 1),
            256.0,
        );
        assert!(!raster.fills.is_empty());
        assert!(raster.fills.iter().all(|f| f.color == YELLOW));
        // Columns 90..=180 (the last one sits on the tile's east edge), rows from the equator up.
        let min_j = raster.fills.iter().map(|f| f.cell.j).min().unwrap();
        assert_eq!(min_j, 0);
        assert!(raster.fills.iter().any(|f| f.cell.j == 90));
        assert!(raster.fills.iter().all(|f| f.cell.i >= 45));
    }

    #[test]
    fn tile_past_the_antimeridian_is_contiguous() {
        let g = grid(0.0);
        // x = 2 at z = 1 is the first tile east of the primary world: lon 180..360.
        let raster = render_tile(
            &g,
            &ColorGradient::temperature(),
            &WebMercator::default(),
            TileCoord::new(2, 0, 1),
            256.0,
        );
        let row: Vec<_> = raster.fills.iter().filter(|f| f.cell.i == 60).collect();
        assert_eq!(row.first().unwrap().cell.j, 0);
        assert!(row.first().unwrap().rect.x1.abs() < 1e-6);
        for pair in row.windows(2) {
            assert!((pair[0].rect.x2 - pair[1].rect.x1).abs() < 1e-6);
            assert_eq!(pair[1].cell.j, (pair[0].cell.j + 1) % g.n_lon());
        }
    }

    #[test]
    fn rendering_is_idempotent() {
        let g = GridModel::with_climatology(GridConfig::default()).unwrap();
        let mut layer = TempFieldLayer::default();
        let a = layer.render_tile(&g, TileCoord::new(3, 2, 2));
        let b = layer.render_tile(&g, TileCoord::new(3, 2, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn rgba_output_applies_opacity() {
        let g = grid(15.0);
        let mut layer = TempFieldLayer::default();
        let px = layer.render_tile_rgba(&g, TileCoord::new(0, 0, 1));
        assert_eq!(px.len(), 256 * 256 * 4);
        let o = (128 * 256 + 128) * 4;
        let alpha = (0.70f32 * 255.0).round() as u8;
        assert_eq!(&px[o..o + 4], &[0xff, 0xff, 0xbf, alpha]);
    }

    #[test]
    fn mutation_marks_layer_stale() {
        let mut g = grid(0.0);
        let mut layer = TempFieldLayer::default();
        assert!(!layer.needs_redraw(&g));
        layer.render_tile(&g, TileCoord::new(0, 0, 0));
        assert!(!layer.needs_redraw(&g));
        g.apply_delta([CellIndex::new(10, 10)], 1.0);
        assert!(layer.needs_redraw(&g));
        layer.render_tile(&g, TileCoord::new(0, 0, 0));
        assert!(!layer.needs_redraw(&g));
    }

    #[test]
    fn visible_tiles_cover_the_viewport() {
        let vp = Viewport::new(GeoPoint::new(180.0, 0.0), 2.0, Vec2::new(512.0, 256.0));
        let tiles = visible_tiles(&vp);
        // Center sits on the world's east edge at x = 1024 px: tiles 3 and 4 horizontally.
        let xs: Vec<i64> = tiles.iter().map(|t| t.x).collect();
        assert!(xs.contains(&3) && xs.contains(&4));
        assert!(tiles.iter().all(|t| t.z == 2 && (0..4).contains(&t.y)));
    }
}
