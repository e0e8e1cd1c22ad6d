use tracing::info;

use crate::grid::GridModel;
use crate::selection::CellSelection;

/// Mutable map state shared by the tools and renderers.
///
/// Owned by a single controller and passed by reference to each component.
/// The grid is only mutated through [`MapContext::apply_delta_to_selection`].
#[derive(Debug, Clone)]
pub struct MapContext {
    grid: GridModel,
    selection: CellSelection,
}

impl MapContext {
    pub fn new(grid: GridModel) -> Self {
        let selection = CellSelection::for_grid(&grid);
        Self { grid, selection }
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn selection(&self) -> &CellSelection {
        &self.selection
    }

    /// Replaces the current selection wholesale.
    pub fn set_selection(&mut self, selection: CellSelection) {
        self.selection = selection;
    }

    /// Adds `delta` to every selected cell and consumes the selection so it can
    /// not be applied twice. Returns the number of cells changed.
    pub fn apply_delta_to_selection(&mut self, delta: f64) -> usize {
        let selection = std::mem::replace(&mut self.selection, CellSelection::for_grid(&self.grid));
        if selection.is_empty() || delta == 0.0 {
            return 0;
        }
        let changed = self.grid.apply_delta(selection.iter(), delta);
        info!(changed, delta, "temperature adjustment applied");
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::MapContext;
    use crate::grid::{CellIndex, GridConfig, GridModel};
    use crate::selection::CellSelection;

    #[test]
    fn apply_consumes_selection() {
        let grid = GridModel::filled(GridConfig::default(), 1.0).unwrap();
        let mut ctx = MapContext::new(grid);
        let cells = [CellIndex::new(0, 0), CellIndex::new(5, 5)];
        ctx.set_selection(CellSelection::from_cells(90, 180, cells));

        assert_eq!(ctx.apply_delta_to_selection(-2.0), 2);
        assert!(ctx.selection().is_empty());
        assert_eq!(ctx.grid().get(cells[1]), Some(-1.0));

        assert_eq!(ctx.apply_delta_to_selection(-2.0), 0);
        assert_eq!(ctx.grid().get(cells[1]), Some(-1.0));
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let grid = GridModel::filled(GridConfig::default(), 1.0).unwrap();
        let mut ctx = MapContext::new(grid);
        ctx.set_selection(CellSelection::from_cells(90, 180, [CellIndex::new(0, 0)]));
        assert_eq!(ctx.apply_delta_to_selection(0.0), 0);
        assert_eq!(ctx.grid().generation(), 0);
    }
}
