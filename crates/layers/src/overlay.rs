use formats::geojson::VectorFeature;
use foundation::geometry::Geometry;
use foundation::viewport::Viewport;
use foundation::wrap::{WORLD_COPIES, world_copies};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::colormap::Rgb;
use crate::labels::MISSING_RANK;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::symbology::{StrokeStyle, ZoomSteps};

/// Which border lines are drawn at a zoom, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderPolicy {
    pub rank_fields: Vec<String>,
    pub max_rank: ZoomSteps<i32>,
    /// Per-feature minimum zoom; ignored when absent or non-numeric.
    pub min_zoom_field: String,
    /// Features with "water" in any of these fields are not drawn.
    pub class_fields: Vec<String>,
    pub color: Rgb,
    pub weight_px: ZoomSteps<f64>,
    pub opacity: f32,
}

impl Default for BorderPolicy {
    fn default() -> Self {
        Self {
            rank_fields: vec!["SCALERANK".into(), "scalerank".into()],
            max_rank: ZoomSteps::new(&[(2, 0), (3, 1), (4, 2), (5, 3), (6, 5)], 10),
            min_zoom_field: "MIN_ZOOM".into(),
            class_fields: vec!["TYPE".into(), "FEATURECLA".into()],
            color: Rgb::new(0x66, 0x66, 0x66),
            weight_px: ZoomSteps::new(&[(5, 0.9)], 1.3),
            opacity: 0.85,
        }
    }
}

impl BorderPolicy {
    pub fn passes(&self, feature: &VectorFeature, zoom: i32) -> bool {
        let rank = feature
            .first_property_f64(&self.rank_fields)
            .unwrap_or(MISSING_RANK);
        if rank > self.max_rank.at(zoom) as f64 {
            return false;
        }
        if let Some(min_zoom) = feature.property_f64(&self.min_zoom_field)
            && (zoom as f64) < min_zoom
        {
            return false;
        }
        !self.class_fields.iter().any(|field| {
            feature
                .property_str(field)
                .is_some_and(|v| v.to_lowercase().contains("water"))
        })
    }

    pub fn stroke(&self, zoom: i32) -> StrokeStyle {
        StrokeStyle::new(self.color, self.weight_px.at(zoom), self.opacity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayRule {
    /// Every feature, fixed stroke.
    Coastline(StrokeStyle),
    Borders(BorderPolicy),
}

impl OverlayRule {
    pub fn coastline() -> Self {
        OverlayRule::Coastline(StrokeStyle::new(Rgb::new(0x11, 0x11, 0x11), 1.2, 0.9))
    }

    fn passes(&self, feature: &VectorFeature, zoom: i32) -> bool {
        match self {
            OverlayRule::Coastline(_) => true,
            OverlayRule::Borders(policy) => policy.passes(feature, zoom),
        }
    }

    pub fn stroke(&self, zoom: i32) -> StrokeStyle {
        match self {
            OverlayRule::Coastline(stroke) => *stroke,
            OverlayRule::Borders(policy) => policy.stroke(zoom),
        }
    }
}

/// One visible world copy of a feature, geometry already shifted.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub feature: usize,
    pub geometry: Geometry,
    pub world_copy: f64,
}

/// What the external line renderer draws for the current viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub kind: LayerKind,
    pub stroke: StrokeStyle,
    pub items: Vec<OverlayItem>,
}

/// Replicates each accepted feature at every world copy and keeps the copies
/// that touch the padded viewport.
pub fn visible_overlay<F>(features: &[VectorFeature], viewport: &Viewport, margin: f64, accept: F) -> Vec<OverlayItem>
where
    F: Fn(&VectorFeature) -> bool,
{
    let padded = viewport.bounds().padded(margin);
    let mut out = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        if !accept(feature) {
            continue;
        }
        for (geometry, shift) in world_copies(&feature.geometry).into_iter().zip(WORLD_COPIES) {
            if geometry.intersects_bounds(&padded) {
                out.push(OverlayItem {
                    feature: index,
                    geometry,
                    world_copy: shift,
                });
            }
        }
    }
    out
}

/// Static line overlay (coastline or borders) loaded once and re-culled per
/// viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    id: LayerId,
    kind: LayerKind,
    pub rule: OverlayRule,
    pub cull_margin: f64,
    features: Option<Vec<VectorFeature>>,
}

impl OverlayLayer {
    pub fn coastline(id: u64) -> Self {
        Self::new(id, LayerKind::Coastline, OverlayRule::coastline())
    }

    pub fn borders(id: u64, policy: BorderPolicy) -> Self {
        Self::new(id, LayerKind::Borders, OverlayRule::Borders(policy))
    }

    fn new(id: u64, kind: LayerKind, rule: OverlayRule) -> Self {
        Self {
            id: LayerId(id),
            kind,
            rule,
            cull_margin: 0.15,
            features: None,
        }
    }

    pub fn load(&mut self, features: Vec<VectorFeature>) -> usize {
        let count = features.len();
        self.features = Some(features);
        count
    }

    pub fn is_loaded(&self) -> bool {
        self.features.is_some()
    }

    /// Items to draw for `viewport`; `None` until a dataset is loaded.
    pub fn snapshot(&self, viewport: &Viewport) -> Option<OverlaySnapshot> {
        let features = self.features.as_ref()?;
        let zoom = viewport.zoom_level();
        let items = visible_overlay(features, viewport, self.cull_margin, |f| {
            self.rule.passes(f, zoom)
        });
        trace!(
            kind = ?self.kind,
            zoom,
            features = features.len(),
            items = items.len(),
            vertices = items.iter().map(|i| i.geometry.vertex_count()).sum::<usize>(),
            "culled overlay"
        );
        Some(OverlaySnapshot {
            kind: self.kind,
            stroke: self.rule.stroke(zoom),
            items,
        })
    }
}

impl Layer for OverlayLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        self.kind
    }
}
