use compute::analysis::{SelectionStats, select_cells, selection_stats};
use formats::geojson::FeatureCollection;
use foundation::geometry::GeoPoint;
use foundation::math::Vec2;
use foundation::time::Time;
use foundation::viewport::Viewport;
use layers::labels::{LabelPlacement, LabelsLayer};
use layers::layer::Layer;
use layers::overlay::{OverlayLayer, OverlaySnapshot};
use layers::temperature::{TempFieldLayer, TileCoord, TileRaster, visible_tiles};
use runtime::event_bus::{Event, EventBus, MapEvent};
use runtime::redraw::RedrawScheduler;
use scene::context::MapContext;
use scene::grid::{GridConfigError, GridModel};
use scene::selection::CellSelection;
use tracing::{debug, info};

use crate::config::MapConfig;
use crate::tool::{LassoPhase, SelectionTool, ToolEffect, ToolMode};

const TEMPERATURE_LAYER: u64 = 1;
const COASTLINE_LAYER: u64 = 2;
const BORDERS_LAYER: u64 = 3;
const LABELS_LAYER: u64 = 4;

#[derive(Debug)]
pub enum StartupError {
    Grid(GridConfigError),
    /// The host surface has no usable size or position yet.
    Viewport(Viewport),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Grid(e) => write!(f, "invalid grid: {e}"),
            StartupError::Viewport(v) => write!(
                f,
                "map surface not initialized (center {:?}, zoom {}, size {}x{})",
                v.center, v.zoom, v.size_px.x, v.size_px.y
            ),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<GridConfigError> for StartupError {
    fn from(value: GridConfigError) -> Self {
        StartupError::Grid(value)
    }
}

/// Owns all mutable map state and routes host events to the components.
///
/// Every method takes the host's timestamp; the controller never reads a
/// clock. Results the host must act on are published on the event bus.
#[derive(Debug)]
pub struct MapController {
    context: MapContext,
    viewport: Viewport,
    temperature: TempFieldLayer,
    labels: LabelsLayer,
    coastline: OverlayLayer,
    borders: OverlayLayer,
    tool: SelectionTool,
    redraw: RedrawScheduler,
    bus: EventBus,

    /// Delta chosen in the adjustment panel, applied by [`MapController::apply`].
    pending_delta: f64,

    /// In-progress or last finished selection ring.
    preview: Vec<GeoPoint>,

    coastline_snapshot: Option<OverlaySnapshot>,
    borders_snapshot: Option<OverlaySnapshot>,
}

impl MapController {
    /// Builds the controller over a seeded temperature field.
    pub fn new(config: MapConfig, viewport: Viewport) -> Result<Self, StartupError> {
        let grid = GridModel::with_climatology(config.grid)?;
        Self::with_grid(config, grid, viewport)
    }

    pub fn with_grid(config: MapConfig, grid: GridModel, viewport: Viewport) -> Result<Self, StartupError> {
        if !viewport.is_valid() {
            return Err(StartupError::Viewport(viewport));
        }
        let mut temperature = TempFieldLayer::new(TEMPERATURE_LAYER, config.gradient);
        temperature.style = config.temperature;

        info!(
            n_lat = grid.n_lat(),
            n_lon = grid.n_lon(),
            zoom = viewport.zoom,
            "map controller ready"
        );
        let mut controller = Self {
            context: MapContext::new(grid),
            viewport,
            temperature,
            labels: LabelsLayer::new(LABELS_LAYER, config.labels),
            coastline: OverlayLayer::coastline(COASTLINE_LAYER),
            borders: OverlayLayer::borders(BORDERS_LAYER, config.borders),
            tool: SelectionTool::new(config.lasso),
            redraw: RedrawScheduler::new(config.redraw),
            bus: EventBus::new(),
            pending_delta: 0.0,
            preview: Vec::new(),
            coastline_snapshot: None,
            borders_snapshot: None,
        };
        let registered: [&dyn Layer; 4] = [
            &controller.temperature,
            &controller.coastline,
            &controller.borders,
            &controller.labels,
        ];
        for layer in registered {
            debug!(id = layer.id().0, kind = ?layer.kind(), "layer registered");
        }
        controller.redraw.request(Time::default());
        Ok(controller)
    }

    pub fn grid(&self) -> &GridModel {
        self.context.grid()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> &CellSelection {
        self.context.selection()
    }

    pub fn tool(&self) -> &SelectionTool {
        &self.tool
    }

    pub fn preview(&self) -> &[GeoPoint] {
        &self.preview
    }

    pub fn events(&self) -> &[Event] {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.bus.drain()
    }

    /// Pan/zoom end. Label and overlay work is deferred to the next flush.
    pub fn on_viewport_changed(&mut self, now: Time, viewport: Viewport) {
        if !viewport.is_valid() {
            debug!(?viewport, "ignoring invalid viewport");
            return;
        }
        self.viewport = viewport;
        self.redraw.request(now);
    }

    pub fn on_animation_frame(&mut self, now: Time) -> bool {
        if !self.redraw.on_animation_frame(now) {
            return false;
        }
        self.refresh_viewport_layers(now);
        true
    }

    pub fn on_timer(&mut self, now: Time) -> bool {
        if !self.redraw.poll_timer(now) {
            return false;
        }
        self.refresh_viewport_layers(now);
        true
    }

    /// When the host should call [`MapController::on_timer`] next.
    pub fn redraw_deadline(&self) -> Option<Time> {
        self.redraw.deadline()
    }

    fn refresh_viewport_layers(&mut self, now: Time) {
        let count = self.labels.placement(&self.viewport).labels.len();
        self.bus.emit(now, MapEvent::LabelsPlaced { count });

        self.coastline_snapshot = self.coastline.snapshot(&self.viewport);
        self.borders_snapshot = self.borders.snapshot(&self.viewport);
        let items = |s: &Option<OverlaySnapshot>| s.as_ref().map_or(0, |s| s.items.len());
        self.bus.emit(
            now,
            MapEvent::OverlaysCulled {
                coastline: items(&self.coastline_snapshot),
                borders: items(&self.borders_snapshot),
            },
        );
    }

    pub fn labels(&self) -> Option<&LabelPlacement> {
        self.labels.last_placement()
    }

    pub fn coastline(&self) -> Option<&OverlaySnapshot> {
        self.coastline_snapshot.as_ref()
    }

    pub fn borders(&self) -> Option<&OverlaySnapshot> {
        self.borders_snapshot.as_ref()
    }

    pub fn load_labels(&mut self, now: Time, collection: &FeatureCollection) -> usize {
        let replaced = self.labels.is_loaded();
        let count = self.labels.load(&collection.features);
        info!(records = collection.len(), candidates = count, replaced, "labels loaded");
        self.redraw.request(now);
        count
    }

    pub fn load_coastline(&mut self, now: Time, collection: FeatureCollection) -> usize {
        let replaced = self.coastline.is_loaded();
        let count = self.coastline.load(collection.features);
        info!(features = count, replaced, "coastline loaded");
        self.redraw.request(now);
        count
    }

    pub fn load_borders(&mut self, now: Time, collection: FeatureCollection) -> usize {
        let replaced = self.borders.is_loaded();
        let count = self.borders.load(collection.features);
        info!(features = count, replaced, "borders loaded");
        self.redraw.request(now);
        count
    }

    pub fn render_tile(&mut self, coord: TileCoord) -> TileRaster {
        self.temperature.render_tile(self.context.grid(), coord)
    }

    pub fn render_tile_rgba(&mut self, coord: TileCoord) -> Vec<u8> {
        self.temperature.render_tile_rgba(self.context.grid(), coord)
    }

    pub fn visible_tiles(&self) -> Vec<TileCoord> {
        visible_tiles(&self.viewport)
    }

    pub fn tiles_stale(&self) -> bool {
        self.temperature.needs_redraw(self.context.grid())
    }

    pub fn toggle_tool(&mut self, now: Time, mode: ToolMode) {
        let effects = self.tool.toggle(mode);
        self.run_effects(now, effects);
    }

    pub fn pointer_down(&mut self, now: Time, px: Vec2) {
        let effects = self.tool.pointer_down(px);
        self.run_effects(now, effects);
    }

    pub fn pointer_move(&mut self, now: Time, px: Vec2) {
        let effects = self.tool.pointer_move(now, px, &self.viewport);
        self.run_effects(now, effects);
    }

    pub fn pointer_up(&mut self, now: Time, px: Vec2) {
        let effects = self.tool.pointer_up(px, &self.viewport);
        self.run_effects(now, effects);
    }

    /// Window-level pointer release while a lasso may still be drawing.
    pub fn pointer_left_window(&mut self, now: Time) {
        let effects = self.tool.pointer_left_window(&self.viewport);
        self.run_effects(now, effects);
    }

    pub fn polygon_created(&mut self, now: Time, ring: Vec<GeoPoint>) {
        let effects = self.tool.polygon_created(ring);
        self.run_effects(now, effects);
    }

    pub fn is_drawing(&self) -> bool {
        self.tool.phase() == LassoPhase::Drawing
    }

    fn run_effects(&mut self, now: Time, effects: Vec<ToolEffect>) {
        for effect in effects {
            match effect {
                ToolEffect::SetDragging(enabled) => {
                    self.bus.emit(now, MapEvent::DraggingEnabled(enabled));
                }
                ToolEffect::Preview(points) => {
                    self.bus.emit(now, MapEvent::PreviewUpdated { points: points.len() });
                    self.preview = points;
                }
                ToolEffect::Finished(ring) => {
                    self.select(now, &ring);
                }
            }
        }
    }

    /// Replaces the selection with the cells inside `ring`.
    pub fn select(&mut self, now: Time, ring: &[GeoPoint]) -> usize {
        let selection = select_cells(self.context.grid(), ring);
        let count = selection.len();
        let summary = selection.summary_text();
        self.context.set_selection(selection);
        info!(vertices = ring.len(), selected = count, "selection replaced");
        self.bus.emit(now, MapEvent::SelectionChanged { count, summary });
        count
    }

    pub fn selection_summary(&self) -> String {
        self.context.selection().summary_text()
    }

    pub fn selection_stats(&self) -> Option<SelectionStats> {
        selection_stats(self.context.grid(), self.context.selection())
    }

    pub fn pending_delta(&self) -> f64 {
        self.pending_delta
    }

    pub fn set_pending_delta(&mut self, delta: f64) {
        self.pending_delta = if delta.is_finite() { delta } else { 0.0 };
    }

    /// Applies the pending delta to the selection, consuming both. Returns the
    /// number of cells changed.
    pub fn apply(&mut self, now: Time) -> usize {
        let delta = std::mem::take(&mut self.pending_delta);
        let changed = self.context.apply_delta_to_selection(delta);
        self.bus.emit(now, MapEvent::SelectionCleared);
        if changed > 0 {
            self.bus.emit(
                now,
                MapEvent::TilesInvalidated {
                    generation: self.context.grid().generation(),
                },
            );
        }
        changed
    }

    /// Shorthand for setting the delta and applying it.
    pub fn apply_delta(&mut self, now: Time, delta: f64) -> usize {
        self.set_pending_delta(delta);
        self.apply(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene::grid::{CellIndex, GridConfig};

    fn viewport() -> Viewport {
        Viewport::new(GeoPoint::new(10.0, 10.0), 4.0, Vec2::new(800.0, 600.0))
    }

    fn controller() -> MapController {
        let grid = GridModel::filled(GridConfig::default(), 0.0).unwrap();
        MapController::with_grid(MapConfig::default(), grid, viewport()).unwrap()
    }

    fn kinds(c: &MapController) -> Vec<&'static str> {
        c.events().iter().map(|e| e.event.kind()).collect()
    }

    #[test]
    fn uninitialized_surface_fails_fast() {
        let vp = Viewport::new(GeoPoint::new(0.0, 0.0), 3.0, Vec2::new(0.0, 0.0));
        let err = MapController::new(MapConfig::default(), vp).unwrap_err();
        assert!(matches!(err, StartupError::Viewport(_)));
    }

    #[test]
    fn bad_grid_fails_fast() {
        let mut config = MapConfig::default();
        config.grid = GridConfig::new(7.0, 2.0);
        assert!(matches!(
            MapController::new(config, viewport()),
            Err(StartupError::Grid(_))
        ));
    }

    #[test]
    fn first_frame_flushes_the_initial_redraw() {
        let mut c = controller();
        assert!(c.on_animation_frame(Time(0.016)));
        assert!(!c.on_animation_frame(Time(0.032)));
        // No datasets yet: empty placement, no overlays.
        assert_eq!(c.labels().map(|p| p.labels.len()), Some(0));
        assert!(c.coastline().is_none());
        assert_eq!(kinds(&c), vec!["labels_placed", "overlays_culled"]);
    }

    #[test]
    fn timer_fallback_refreshes_when_frames_starve() {
        let mut c = controller();
        c.on_animation_frame(Time(0.0));
        c.on_viewport_changed(Time(1.0), viewport());
        assert!(!c.on_timer(Time(1.05)));
        assert!(c.on_timer(Time(1.2)));
    }

    #[test]
    fn polygon_selection_publishes_summary() {
        let mut c = controller();
        c.toggle_tool(Time(0.0), ToolMode::Polygon);
        let ring = vec![
            GeoPoint::new(8.5, 8.5),
            GeoPoint::new(9.5, 8.5),
            GeoPoint::new(9.5, 9.5),
            GeoPoint::new(8.5, 9.5),
        ];
        c.polygon_created(Time(1.0), ring);
        assert_eq!(c.selection().len(), 1);
        assert!(c.selection().contains(CellIndex::new(49, 94)));
        assert_eq!(c.selection_summary(), "Adjust 1 selected cells");
        assert!(c.tool().dragging_enabled());
    }

    #[test]
    fn apply_consumes_selection_and_invalidates_tiles() {
        let mut c = controller();
        c.render_tile(TileCoord::new(0, 0, 0));
        c.select(Time(0.0), &[
            GeoPoint::new(8.5, 8.5),
            GeoPoint::new(9.5, 8.5),
            GeoPoint::new(9.5, 9.5),
            GeoPoint::new(8.5, 9.5),
        ]);
        c.drain_events();

        assert_eq!(c.apply_delta(Time(1.0), 5.0), 1);
        assert!(c.selection().is_empty());
        assert_eq!(c.pending_delta(), 0.0);
        assert!(c.tiles_stale());
        assert_eq!(kinds(&c), vec!["selection_cleared", "tiles_invalidated"]);

        // Nothing left to apply.
        assert_eq!(c.apply_delta(Time(2.0), 5.0), 0);
        assert_eq!(c.grid().get(CellIndex::new(49, 94)), Some(5.0));
    }

    #[test]
    fn stats_describe_the_selection() {
        let mut c = controller();
        assert!(c.selection_stats().is_none());
        c.select(Time(0.0), &[
            GeoPoint::new(8.0, 8.0),
            GeoPoint::new(12.0, 8.0),
            GeoPoint::new(12.0, 12.0),
            GeoPoint::new(8.0, 12.0),
        ]);
        let stats = c.selection_stats().unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 0.0);
    }
}
