use scene::grid::GridModel;
use scene::selection::CellSelection;

pub struct Statistics;

impl Statistics {
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(sum / values.len() as f64)
    }

    pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
        let first = *values.first()?;
        let mut min = first;
        let mut max = first;
        for &v in values.iter().skip(1) {
            min = min.min(v);
            max = max.max(v);
        }
        Some((min, max))
    }
}

/// Summary of the current values under a selection, for the adjustment panel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SelectionStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn selection_stats(grid: &GridModel, selection: &CellSelection) -> Option<SelectionStats> {
    let values: Vec<f64> = selection.iter().filter_map(|c| grid.get(c)).collect();
    let mean = Statistics::mean(&values)?;
    let (min, max) = Statistics::min_max(&values)?;
    Some(SelectionStats {
        count: values.len(),
        mean,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::{Statistics, selection_stats};
    use scene::grid::{CellIndex, GridConfig, GridModel};
    use scene::selection::CellSelection;

    #[test]
    fn mean_works() {
        let m = Statistics::mean(&[1.0, 2.0, 3.0]).unwrap();
        assert!((m - 2.0).abs() < 1e-9);
        assert!(Statistics::mean(&[]).is_none());
    }

    #[test]
    fn stats_over_selection() {
        let mut grid = GridModel::filled(GridConfig::default(), 10.0).unwrap();
        grid.apply_delta([CellIndex::new(0, 1)], 4.0);
        let sel = CellSelection::from_cells(90, 180, [CellIndex::new(0, 0), CellIndex::new(0, 1)]);
        let stats = selection_stats(&grid, &sel).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 14.0);
        assert!((stats.mean - 12.0).abs() < 1e-9);

        assert!(selection_stats(&grid, &CellSelection::for_grid(&grid)).is_none());
    }
}
