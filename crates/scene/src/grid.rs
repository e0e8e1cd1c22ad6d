use foundation::bounds::GeoBounds;
use foundation::geometry::GeoPoint;
use foundation::wrap::wrap_lon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grid resolution in degrees. Fixed for the lifetime of a [`GridModel`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub d_lat_deg: f64,
    pub d_lon_deg: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            d_lat_deg: 2.0,
            d_lon_deg: 2.0,
        }
    }
}

impl GridConfig {
    pub fn new(d_lat_deg: f64, d_lon_deg: f64) -> Self {
        Self {
            d_lat_deg,
            d_lon_deg,
        }
    }

    /// Returns `(n_lat, n_lon)` or the reason the resolution is unusable.
    pub fn dimensions(&self) -> Result<(usize, usize), GridConfigError> {
        let n_lat = divisions(180.0, self.d_lat_deg).ok_or(GridConfigError::LatitudeStep {
            d_lat_deg: self.d_lat_deg,
        })?;
        let n_lon = divisions(360.0, self.d_lon_deg).ok_or(GridConfigError::LongitudeStep {
            d_lon_deg: self.d_lon_deg,
        })?;
        Ok((n_lat, n_lon))
    }
}

fn divisions(span: f64, step: f64) -> Option<usize> {
    if !step.is_finite() || step <= 0.0 || step > span {
        return None;
    }
    let n = span / step;
    let rounded = n.round();
    if (n - rounded).abs() > 1e-9 {
        return None;
    }
    Some(rounded as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridConfigError {
    LatitudeStep { d_lat_deg: f64 },
    LongitudeStep { d_lon_deg: f64 },
}

impl std::fmt::Display for GridConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridConfigError::LatitudeStep { d_lat_deg } => {
                write!(f, "latitude step {d_lat_deg} is not a positive divisor of 180")
            }
            GridConfigError::LongitudeStep { d_lon_deg } => {
                write!(f, "longitude step {d_lon_deg} is not a positive divisor of 360")
            }
        }
    }
}

impl std::error::Error for GridConfigError {}

/// Cell address: `i` counts latitude bands south to north, `j` longitude bands
/// west to east starting at -180.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIndex {
    pub i: usize,
    pub j: usize,
}

impl CellIndex {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// Temperature field over a regular lat/lon grid.
///
/// The only owner of cell values. Every mutation bumps [`GridModel::generation`],
/// which renderers compare against to decide whether their tiles are stale.
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    config: GridConfig,
    n_lat: usize,
    n_lon: usize,
    values: Vec<f64>,
    generation: u64,
}

impl GridModel {
    pub fn filled(config: GridConfig, value: f64) -> Result<Self, GridConfigError> {
        Self::from_fn(config, |_| value)
    }

    /// Smooth synthetic climatology: warm equator, cold poles, a zonal wave.
    pub fn with_climatology(config: GridConfig) -> Result<Self, GridConfigError> {
        Self::from_fn(config, |center| {
            let lat_term = 30.0 - 0.5 * center.lat_deg.abs();
            let lat_weight = center.lat_deg.to_radians().cos();
            let lon_term = 8.0 * lat_weight * (2.0 * center.lon_deg).to_radians().sin();
            lat_term + lon_term
        })
    }

    /// Seeds every cell from its center point.
    pub fn from_fn(
        config: GridConfig,
        mut f: impl FnMut(GeoPoint) -> f64,
    ) -> Result<Self, GridConfigError> {
        let (n_lat, n_lon) = config.dimensions()?;
        let mut values = Vec::with_capacity(n_lat * n_lon);
        for i in 0..n_lat {
            for j in 0..n_lon {
                values.push(f(center_of(&config, CellIndex::new(i, j))));
            }
        }
        debug!(n_lat, n_lon, "grid initialized");
        Ok(Self {
            config,
            n_lat,
            n_lon,
            values,
            generation: 0,
        })
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    pub fn n_lat(&self) -> usize {
        self.n_lat
    }

    pub fn n_lon(&self) -> usize {
        self.n_lon
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Incremented on every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cell containing `p`. Longitude is wrapped first and latitude clamped, so
    /// every input maps to some cell.
    pub fn cell_at(&self, p: GeoPoint) -> CellIndex {
        let lon = wrap_lon(p.lon_deg);
        let j = ((lon + 180.0) / self.config.d_lon_deg).floor() as i64;
        let i = ((p.lat_deg + 90.0) / self.config.d_lat_deg).floor() as i64;
        CellIndex::new(
            i.clamp(0, self.n_lat as i64 - 1) as usize,
            self.wrap_column(j),
        )
    }

    /// Maps an unwrapped column index (any integer) back into `[0, n_lon)`.
    pub fn wrap_column(&self, j_unwrapped: i64) -> usize {
        j_unwrapped.rem_euclid(self.n_lon as i64) as usize
    }

    /// Clamps an unbounded row index into `[0, n_lat)`.
    pub fn clamp_row(&self, i_unbounded: i64) -> usize {
        i_unbounded.clamp(0, self.n_lat as i64 - 1) as usize
    }

    pub fn cell_center(&self, cell: CellIndex) -> GeoPoint {
        center_of(&self.config, cell)
    }

    pub fn cell_bounds(&self, cell: CellIndex) -> GeoBounds {
        let south = -90.0 + cell.i as f64 * self.config.d_lat_deg;
        let west = -180.0 + cell.j as f64 * self.config.d_lon_deg;
        GeoBounds::new(
            west,
            south,
            west + self.config.d_lon_deg,
            south + self.config.d_lat_deg,
        )
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.i < self.n_lat && cell.j < self.n_lon
    }

    pub fn get(&self, cell: CellIndex) -> Option<f64> {
        if !self.contains(cell) {
            return None;
        }
        self.values.get(cell.i * self.n_lon + cell.j).copied()
    }

    /// Iterates `(cell, value)` in row-major order (south to north, west to east).
    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, f64)> + '_ {
        let n_lon = self.n_lon;
        self.values
            .iter()
            .enumerate()
            .map(move |(flat, v)| (CellIndex::new(flat / n_lon, flat % n_lon), *v))
    }

    /// Adds `delta` to each listed cell. Not idempotent: applying twice shifts twice.
    ///
    /// Out-of-range cells are ignored. Returns the number of cells changed.
    pub fn apply_delta<I>(&mut self, cells: I, delta: f64) -> usize
    where
        I: IntoIterator<Item = CellIndex>,
    {
        let mut changed = 0usize;
        for cell in cells {
            if !self.contains(cell) {
                continue;
            }
            self.values[cell.i * self.n_lon + cell.j] += delta;
            changed += 1;
        }
        if changed > 0 {
            self.generation += 1;
        }
        debug!(changed, delta, generation = self.generation, "applied delta");
        changed
    }
}

fn center_of(config: &GridConfig, cell: CellIndex) -> GeoPoint {
    GeoPoint::new(
        -180.0 + (cell.j as f64 + 0.5) * config.d_lon_deg,
        -90.0 + (cell.i as f64 + 0.5) * config.d_lat_deg,
    )
}

#[cfg(test)]
mod tests {
    use super::{CellIndex, GridConfig, GridConfigError, GridModel};
    use foundation::geometry::GeoPoint;

    fn grid2() -> GridModel {
        GridModel::filled(GridConfig::default(), 0.0).unwrap()
    }

    #[test]
    fn default_resolution_dimensions() {
        let g = grid2();
        assert_eq!(g.n_lat(), 90);
        assert_eq!(g.n_lon(), 180);
        assert_eq!(g.len(), 90 * 180);
    }

    #[test]
    fn rejects_non_divisors() {
        assert_eq!(
            GridConfig::new(7.0, 2.0).dimensions(),
            Err(GridConfigError::LatitudeStep { d_lat_deg: 7.0 })
        );
        assert_eq!(
            GridConfig::new(2.0, 0.0).dimensions(),
            Err(GridConfigError::LongitudeStep { d_lon_deg: 0.0 })
        );
        assert!(GridConfig::new(5.0, 5.0).dimensions().is_ok());
        assert!(GridModel::filled(GridConfig::new(-2.0, 2.0), 0.0).is_err());
    }

    #[test]
    fn cell_at_stays_in_range() {
        let g = grid2();
        for lat in [-120.0, -90.0, -89.9, 0.0, 45.5, 89.999, 90.0, 400.0] {
            for lon in [-900.0, -180.0, -0.1, 0.0, 179.999, 180.0, 359.0, 1e6] {
                let c = g.cell_at(GeoPoint::new(lon, lat));
                assert!(c.i < g.n_lat() && c.j < g.n_lon(), "({lat}, {lon}) -> {c:?}");
            }
        }
    }

    #[test]
    fn cell_at_is_periodic_in_longitude() {
        let g = grid2();
        for lat in [-60.0, -1.0, 0.5, 33.3, 80.0] {
            for lon in [-179.5, -91.0, -0.5, 0.0, 12.3, 178.9] {
                let a = g.cell_at(GeoPoint::new(lon, lat));
                assert_eq!(a, g.cell_at(GeoPoint::new(lon + 360.0, lat)));
                assert_eq!(a, g.cell_at(GeoPoint::new(lon - 720.0, lat)));
            }
        }
    }

    #[test]
    fn cell_at_uses_floor_division() {
        let g = grid2();
        assert_eq!(g.cell_at(GeoPoint::new(-180.0, -90.0)), CellIndex::new(0, 0));
        assert_eq!(g.cell_at(GeoPoint::new(10.0, 10.0)), CellIndex::new(50, 95));
        assert_eq!(g.cell_at(GeoPoint::new(9.99, 9.99)), CellIndex::new(49, 94));
        assert_eq!(g.cell_at(GeoPoint::new(180.0, 90.0)), CellIndex::new(89, 0));
    }

    #[test]
    fn center_and_bounds_agree_with_cell_at() {
        let g = grid2();
        let c = CellIndex::new(49, 94);
        let center = g.cell_center(c);
        assert_eq!(center, GeoPoint::new(9.0, 9.0));
        assert_eq!(g.cell_at(center), c);
        let b = g.cell_bounds(c);
        assert_eq!((b.west, b.south, b.east, b.north), (8.0, 8.0, 10.0, 10.0));
    }

    #[test]
    fn apply_delta_shifts_only_listed_cells() {
        let mut g = grid2();
        let cells = [CellIndex::new(1, 1), CellIndex::new(2, 3), CellIndex::new(89, 179)];
        assert_eq!(g.apply_delta(cells, 5.0), 3);
        for c in cells {
            assert_eq!(g.get(c), Some(5.0));
        }
        assert_eq!(g.get(CellIndex::new(0, 0)), Some(0.0));
        assert_eq!(g.generation(), 1);

        g.apply_delta(cells, 5.0);
        assert_eq!(g.get(cells[0]), Some(10.0));
        assert_eq!(g.generation(), 2);
    }

    #[test]
    fn apply_delta_ignores_out_of_range() {
        let mut g = grid2();
        assert_eq!(g.apply_delta([CellIndex::new(90, 0)], 1.0), 0);
        assert_eq!(g.generation(), 0);
    }

    #[test]
    fn climatology_is_warm_at_equator_and_cold_at_poles() {
        let g = GridModel::with_climatology(GridConfig::default()).unwrap();
        let equator = g.get(g.cell_at(GeoPoint::new(0.5, 0.5))).unwrap();
        let pole = g.get(g.cell_at(GeoPoint::new(0.5, 89.5))).unwrap();
        assert!(equator > 25.0);
        assert!(pole < -10.0);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: GridConfig = serde_json::from_str(r#"{"d_lat_deg": 5.0}"#).unwrap();
        assert_eq!(cfg, GridConfig::new(5.0, 2.0));
    }
}
