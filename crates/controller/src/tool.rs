//! Selection tools: freehand lasso and click-drawn polygon.
//!
//! The tool never touches the grid or the host map directly. Every transition
//! returns the [`ToolEffect`]s the controller must carry out, so cleanup on each
//! exit path is visible in one place.

use compute::analysis::simplify_polyline;
use foundation::geometry::GeoPoint;
use foundation::math::Vec2;
use foundation::time::Time;
use foundation::viewport::Viewport;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoConfig {
    /// Minimum time between accepted pointer samples.
    pub min_interval_ms: f64,
    /// Minimum on-screen distance from the previous accepted sample.
    pub min_distance_px: f64,
    pub simplify_tolerance_px: f64,
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 16.0,
            min_distance_px: 3.0,
            simplify_tolerance_px: 2.0,
        }
    }
}

/// Active tool, mirroring the two toggle buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    None,
    Lasso,
    Polygon,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LassoPhase {
    #[default]
    Idle,
    Drawing,
    Finished,
}

/// Side effect requested by a tool transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    SetDragging(bool),
    /// Replace the preview overlay; an empty ring removes it.
    Preview(Vec<GeoPoint>),
    /// A closed ring is ready for cell selection.
    Finished(Vec<GeoPoint>),
}

#[derive(Debug, Clone)]
pub struct SelectionTool {
    pub config: LassoConfig,
    mode: ToolMode,
    phase: LassoPhase,

    /// Accepted lasso samples in screen pixels.
    points_px: Vec<Vec2>,

    /// Time of the last sample that passed the interval check.
    last_sample_at: Option<Time>,

    /// Whether map panning is currently enabled.
    dragging: bool,
}

impl Default for SelectionTool {
    fn default() -> Self {
        Self::new(LassoConfig::default())
    }
}

impl SelectionTool {
    pub fn new(config: LassoConfig) -> Self {
        Self {
            config,
            mode: ToolMode::None,
            phase: LassoPhase::Idle,
            points_px: Vec::new(),
            last_sample_at: None,
            dragging: true,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn phase(&self) -> LassoPhase {
        self.phase
    }

    pub fn dragging_enabled(&self) -> bool {
        self.dragging
    }

    pub fn point_count(&self) -> usize {
        self.points_px.len()
    }

    /// Button press for `requested`. Pressing the active tool turns it off;
    /// pressing the other one tears the current tool down first.
    pub fn toggle(&mut self, requested: ToolMode) -> Vec<ToolEffect> {
        let mut effects = self.teardown();
        self.mode = if self.mode == requested {
            ToolMode::None
        } else {
            requested
        };
        if self.mode == ToolMode::Polygon {
            // Host polygon drawing owns the pointer until it reports the ring.
            self.set_dragging(false, &mut effects);
        }
        debug!(mode = ?self.mode, "selection tool toggled");
        effects
    }

    /// Starts a lasso gesture, discarding any unfinished one.
    pub fn pointer_down(&mut self, px: Vec2) -> Vec<ToolEffect> {
        let mut effects = Vec::new();
        if self.mode != ToolMode::Lasso || !px.is_finite() {
            return effects;
        }
        self.phase = LassoPhase::Drawing;
        self.points_px.clear();
        self.points_px.push(px);
        self.last_sample_at = None;
        self.set_dragging(false, &mut effects);
        effects
    }

    /// Appends a sample if it passes the time and distance throttle.
    pub fn pointer_move(&mut self, now: Time, px: Vec2, viewport: &Viewport) -> Vec<ToolEffect> {
        if self.phase != LassoPhase::Drawing || !px.is_finite() {
            return Vec::new();
        }
        if let Some(last) = self.last_sample_at
            && now.millis_since(last) < self.config.min_interval_ms
        {
            return Vec::new();
        }
        self.last_sample_at = Some(now);
        if !self.push_sample(px) {
            return Vec::new();
        }
        vec![ToolEffect::Preview(self.ring_geo(&self.points_px, viewport))]
    }

    /// Ends the gesture: simplify in screen space, convert to geographic
    /// coordinates and hand the ring over. Fewer than three points still
    /// finishes, with a ring that selects nothing.
    pub fn pointer_up(&mut self, px: Vec2, viewport: &Viewport) -> Vec<ToolEffect> {
        if self.phase != LassoPhase::Drawing {
            return Vec::new();
        }
        if px.is_finite() {
            self.push_sample(px);
        }
        self.finish(viewport)
    }

    /// Pointer released outside the map surface. Finishes an unfinished lasso
    /// with the samples collected so far.
    pub fn pointer_left_window(&mut self, viewport: &Viewport) -> Vec<ToolEffect> {
        if self.phase != LassoPhase::Drawing {
            return Vec::new();
        }
        debug!(points = self.points_px.len(), "lasso released outside the map");
        self.finish(viewport)
    }

    fn finish(&mut self, viewport: &Viewport) -> Vec<ToolEffect> {
        let mut effects = Vec::new();
        let raw = std::mem::take(&mut self.points_px);
        let simplified = if raw.len() >= 3 {
            simplify_polyline(&raw, self.config.simplify_tolerance_px)
        } else {
            raw.clone()
        };
        debug!(raw = raw.len(), simplified = simplified.len(), "lasso finished");

        let ring = self.ring_geo(&simplified, viewport);
        self.phase = LassoPhase::Finished;
        self.last_sample_at = None;
        effects.push(ToolEffect::Preview(if ring.len() >= 3 { ring.clone() } else { Vec::new() }));
        effects.push(ToolEffect::Finished(ring));
        self.set_dragging(true, &mut effects);
        effects
    }

    /// The host finished drawing a polygon. Only accepted while the polygon tool
    /// is active; the ring skips throttling and simplification.
    pub fn polygon_created(&mut self, ring: Vec<GeoPoint>) -> Vec<ToolEffect> {
        let mut effects = Vec::new();
        if self.mode != ToolMode::Polygon {
            debug!(mode = ?self.mode, "polygon ignored, polygon tool inactive");
            return effects;
        }
        effects.push(ToolEffect::Finished(ring));
        self.set_dragging(true, &mut effects);
        effects
    }

    fn push_sample(&mut self, px: Vec2) -> bool {
        if let Some(&prev) = self.points_px.last()
            && prev.distance(px) < self.config.min_distance_px
        {
            return false;
        }
        self.points_px.push(px);
        true
    }

    fn ring_geo(&self, points: &[Vec2], viewport: &Viewport) -> Vec<GeoPoint> {
        points.iter().map(|&p| viewport.screen_to_geo(p)).collect()
    }

    /// Resets transient state and undoes every host-side effect of the tool.
    fn teardown(&mut self) -> Vec<ToolEffect> {
        let mut effects = Vec::new();
        let had_preview = self.phase != LassoPhase::Idle;
        self.phase = LassoPhase::Idle;
        self.points_px.clear();
        self.last_sample_at = None;
        if had_preview {
            effects.push(ToolEffect::Preview(Vec::new()));
        }
        self.set_dragging(true, &mut effects);
        effects
    }

    fn set_dragging(&mut self, enabled: bool, effects: &mut Vec<ToolEffect>) {
        if self.dragging != enabled {
            self.dragging = enabled;
            effects.push(ToolEffect::SetDragging(enabled));
        }
    }
}
