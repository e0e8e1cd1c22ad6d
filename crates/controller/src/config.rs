use std::fs;
use std::path::{Path, PathBuf};

use layers::colormap::ColorGradient;
use layers::labels::LabelPolicy;
use layers::overlay::BorderPolicy;
use layers::symbology::LayerStyle;
use runtime::redraw::RedrawConfig;
use scene::grid::{GridConfig, GridConfigError};
use serde::{Deserialize, Serialize};

use crate::tool::LassoConfig;

/// Every tunable of the map in one place. Any subset may be given in JSON; the
/// rest falls back to [`MapConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub grid: GridConfig,
    pub gradient: ColorGradient,
    pub temperature: LayerStyle,
    pub labels: LabelPolicy,
    pub borders: BorderPolicy,
    pub lasso: LassoConfig,
    pub redraw: RedrawConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            gradient: ColorGradient::temperature(),
            temperature: LayerStyle::new(true, 0.70),
            labels: LabelPolicy::default(),
            borders: BorderPolicy::default(),
            lasso: LassoConfig::default(),
            redraw: RedrawConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Grid(GridConfigError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
            ConfigError::Grid(e) => write!(f, "invalid grid: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Grid(e) => Some(e),
        }
    }
}

impl MapConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&payload)
    }

    /// Gradient errors surface while parsing; the grid is checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.dimensions().map_err(ConfigError::Grid)?;
        Ok(())
    }
}
