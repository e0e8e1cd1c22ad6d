use std::collections::HashMap;

use formats::geojson::VectorFeature;
use foundation::bounds::PixelRect;
use foundation::geometry::{GeoPoint, Geometry};
use foundation::math::Vec2;
use foundation::viewport::Viewport;
use foundation::wrap::{WORLD_COPIES, point_visible};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::layer::{Layer, LayerId, LayerKind};
use crate::symbology::ZoomSteps;

/// Rank assigned to records without a usable rank property.
pub const MISSING_RANK: f64 = 999.0;

/// One label per sovereign entity, ready for placement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub sovereign_key: String,
    pub name: String,
    /// Raw dataset rank; fractional ranks are kept for filtering and ordering.
    pub rank: f64,
    pub position: GeoPoint,
}

impl LabelCandidate {
    pub fn new(sovereign_key: impl Into<String>, name: impl Into<String>, rank: f64, position: GeoPoint) -> Self {
        Self {
            sovereign_key: sovereign_key.into(),
            name: name.into(),
            rank,
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPolicy {
    /// Identity fields, tried in order.
    pub key_fields: Vec<String>,
    pub name_field: String,
    pub rank_fields: Vec<String>,
    /// Below this integer zoom nothing is placed.
    pub min_zoom: i32,
    pub max_rank: ZoomSteps<i32>,
    pub placement_cap: ZoomSteps<i32>,
    /// Fraction of the viewport span added on each side before culling.
    pub viewport_margin: f64,
    pub char_width_px: f64,
    pub text_height_px: f64,
    pub padding_px: f64,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            key_fields: vec!["sr_sov_a3".into(), "sr_adm0_a3".into(), "sr_su_a3".into()],
            name_field: "sr_subunit".into(),
            rank_fields: vec!["scalerank".into()],
            min_zoom: 3,
            max_rank: ZoomSteps::new(&[(2, 0), (3, 1), (4, 2), (5, 3)], 10),
            placement_cap: ZoomSteps::new(&[(3, 40), (4, 80), (5, 150)], 300),
            viewport_margin: 0.15,
            char_width_px: 7.0,
            text_height_px: 14.0,
            padding_px: 2.0,
        }
    }
}

impl LabelPolicy {
    /// Estimated footprint of `name` centered on `anchor`, padding included.
    pub fn label_box(&self, name: &str, anchor: Vec2) -> PixelRect {
        let chars = name.chars().count() as f64;
        let width = chars * self.char_width_px + 2.0 * self.padding_px;
        let height = self.text_height_px + 2.0 * self.padding_px;
        PixelRect::centered(anchor.x, anchor.y, width, height)
    }

    fn candidate_from(&self, feature: &VectorFeature) -> Option<LabelCandidate> {
        let key = feature.first_property_str(&self.key_fields)?;
        let name = feature.property_str(&self.name_field)?;
        let position = label_point(&feature.geometry)?;
        let rank = feature
            .first_property_f64(&self.rank_fields)
            .unwrap_or(MISSING_RANK);
        Some(LabelCandidate::new(key, name, rank, position))
    }
}

fn label_point(geometry: &Geometry) -> Option<GeoPoint> {
    let p = match geometry {
        Geometry::Point(p) => *p,
        Geometry::MultiPoint(points) => *points.first()?,
        _ => return None,
    };
    p.is_finite().then_some(p)
}

/// Collapses label records to one candidate per sovereign key.
///
/// The record with the strictly lowest rank wins; on ties the first one seen is
/// kept. Records with no key, no name or no point geometry are skipped. Output
/// keeps the order in which each key was first seen.
pub fn dedupe_by_sovereign(features: &[VectorFeature], policy: &LabelPolicy) -> Vec<LabelCandidate> {
    let mut out: Vec<LabelCandidate> = Vec::new();
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for feature in features {
        let Some(candidate) = policy.candidate_from(feature) else {
            skipped += 1;
            continue;
        };
        match slot_by_key.get(&candidate.sovereign_key) {
            Some(&slot) => {
                if candidate.rank < out[slot].rank {
                    out[slot] = candidate;
                }
            }
            None => {
                slot_by_key.insert(candidate.sovereign_key.clone(), out.len());
                out.push(candidate);
            }
        }
    }

    debug!(
        records = features.len(),
        candidates = out.len(),
        skipped,
        "deduplicated label records"
    );
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub name: String,
    pub sovereign_key: String,
    pub rank: f64,
    /// Position of the placed copy, longitude unwrapped.
    pub position: GeoPoint,
    pub screen_px: Vec2,
    pub bbox: PixelRect,
    /// Longitude shift of the world copy this label was placed in.
    pub world_copy: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelPlacement {
    pub labels: Vec<PlacedLabel>,
    /// Candidates left after the rank filter and viewport cull.
    pub considered: usize,
    /// True when placement stopped at the zoom cap.
    pub capped: bool,
}

/// Greedy, deterministic label placement for one viewport.
///
/// No two returned boxes overlap. Candidates are taken in `(rank, name length)`
/// order inside each world copy, copies west to east, until the zoom cap is hit.
pub fn declutter_labels(candidates: &[LabelCandidate], viewport: &Viewport, policy: &LabelPolicy) -> LabelPlacement {
    let zoom = viewport.zoom_level();
    if zoom < policy.min_zoom || !viewport.is_valid() {
        return LabelPlacement::default();
    }

    let max_rank = policy.max_rank.at(zoom);
    let cap = policy.placement_cap.at(zoom).max(0) as usize;
    let padded = viewport.bounds().padded(policy.viewport_margin);

    let mut ordered: Vec<&LabelCandidate> = candidates
        .iter()
        .filter(|c| c.rank <= max_rank as f64)
        .filter(|c| {
            WORLD_COPIES
                .iter()
                .any(|&shift| point_visible(&padded, c.position.shifted_lon(shift)))
        })
        .collect();
    ordered.sort_by(|a, b| {
        a.rank
            .total_cmp(&b.rank)
            .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
    });

    let (w, h) = (viewport.size_px.x, viewport.size_px.y);
    let mut placed: Vec<PlacedLabel> = Vec::new();
    let mut capped = false;

    'copies: for &shift in WORLD_COPIES.iter() {
        for candidate in &ordered {
            if placed.len() >= cap {
                capped = true;
                break 'copies;
            }
            let position = candidate.position.shifted_lon(shift);
            let screen = viewport.geo_to_screen(position);
            if !screen.is_finite() {
                continue;
            }
            let bbox = policy.label_box(&candidate.name, screen);
            if bbox.is_outside(w, h) {
                continue;
            }
            if placed.iter().any(|p| p.bbox.overlaps(&bbox)) {
                continue;
            }
            placed.push(PlacedLabel {
                name: candidate.name.clone(),
                sovereign_key: candidate.sovereign_key.clone(),
                rank: candidate.rank,
                position,
                screen_px: screen,
                bbox,
                world_copy: shift,
            });
        }
    }

    trace!(
        zoom,
        max_rank,
        considered = ordered.len(),
        placed = placed.len(),
        cap,
        capped,
        "placed labels"
    );
    LabelPlacement {
        labels: placed,
        considered: ordered.len(),
        capped,
    }
}

/// Label layer: the deduplicated dataset plus the placement for the last
/// viewport it was asked about. The policy is fixed at construction, so a
/// cached placement only depends on the viewport and the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelsLayer {
    id: LayerId,
    policy: LabelPolicy,
    candidates: Option<Vec<LabelCandidate>>,
    dataset_generation: u64,
    cached: Option<(Viewport, u64, LabelPlacement)>,
}

impl LabelsLayer {
    pub fn new(id: u64, policy: LabelPolicy) -> Self {
        Self {
            id: LayerId(id),
            policy,
            candidates: None,
            dataset_generation: 0,
            cached: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.candidates.is_some()
    }

    pub fn candidates(&self) -> &[LabelCandidate] {
        self.candidates.as_deref().unwrap_or(&[])
    }

    /// Replaces the dataset. Deduplication runs once here since it does not
    /// depend on the viewport.
    pub fn load(&mut self, features: &[VectorFeature]) -> usize {
        let candidates = dedupe_by_sovereign(features, &self.policy);
        let count = candidates.len();
        self.candidates = Some(candidates);
        self.dataset_generation += 1;
        self.cached = None;
        count
    }

    /// Placement for `viewport`; empty until a dataset is loaded.
    pub fn placement(&mut self, viewport: &Viewport) -> &LabelPlacement {
        let fresh = matches!(
            &self.cached,
            Some((v, generation, _)) if v == viewport && *generation == self.dataset_generation
        );
        if !fresh {
            self.cached = None;
        }
        let (_, _, placement) = self.cached.get_or_insert_with(|| {
            let placement = match &self.candidates {
                Some(candidates) => declutter_labels(candidates, viewport, &self.policy),
                None => LabelPlacement::default(),
            };
            (*viewport, self.dataset_generation, placement)
        });
        placement
    }

    /// Last computed placement without recomputing.
    pub fn last_placement(&self) -> Option<&LabelPlacement> {
        self.cached.as_ref().map(|(_, _, p)| p)
    }
}

impl Default for LabelsLayer {
    fn default() -> Self {
        Self::new(4, LabelPolicy::default())
    }
}

impl Layer for LabelsLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Labels
    }
}
