use serde::{Deserialize, Serialize};

use crate::colormap::Rgb;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    pub visible: bool,
    /// Multiplied into every pixel the layer draws.
    pub opacity: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, opacity: f32) -> Self {
        Self { visible, opacity }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
        }
    }
}

/// Line style handed to the external overlay renderer.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub weight_px: f64,
    pub opacity: f32,
}

impl StrokeStyle {
    pub const fn new(color: Rgb, weight_px: f64, opacity: f32) -> Self {
        Self {
            color,
            weight_px,
            opacity,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomStep<T> {
    /// Inclusive upper zoom bound of this step.
    pub up_to_zoom: i32,
    pub value: T,
}

/// Step function of the integer zoom level.
///
/// Steps are checked in order; the first whose `up_to_zoom` is at least the
/// requested zoom wins, and `otherwise` covers everything past the last step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomSteps<T> {
    pub steps: Vec<ZoomStep<T>>,
    pub otherwise: T,
}

impl<T: Copy> ZoomSteps<T> {
    pub fn new(steps: &[(i32, T)], otherwise: T) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|&(up_to_zoom, value)| ZoomStep { up_to_zoom, value })
                .collect(),
            otherwise,
        }
    }

    pub fn at(&self, zoom: i32) -> T {
        self.steps
            .iter()
            .find(|s| zoom <= s.up_to_zoom)
            .map(|s| s.value)
            .unwrap_or(self.otherwise)
    }
}

#[cfg(test)]
mod tests {
    use super::ZoomSteps;

    #[test]
    fn zoom_steps_pick_first_matching_bound() {
        let steps = ZoomSteps::new(&[(2, 0), (3, 1), (4, 2), (5, 3)], 10);
        assert_eq!(steps.at(-1), 0);
        assert_eq!(steps.at(2), 0);
        assert_eq!(steps.at(3), 1);
        assert_eq!(steps.at(5), 3);
        assert_eq!(steps.at(6), 10);
        assert_eq!(steps.at(18), 10);
    }

    #[test]
    fn zoom_steps_deserialize() {
        let steps: ZoomSteps<f64> = serde_json::from_str(
            r#"{"steps": [{"up_to_zoom": 5, "value": 0.9}], "otherwise": 1.3}"#,
        )
        .unwrap();
        assert_eq!(steps.at(5), 0.9);
        assert_eq!(steps.at(6), 1.3);
    }
}
