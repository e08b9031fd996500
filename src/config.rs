//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindlayout/mindlayout.toml`
//! 3. Local config: `<dir>/.mindlayout.toml`
//! 4. Environment variables: `MINDLAYOUT_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{Dimensions, LayoutParams, StackingMode};

pub const LOCAL_CONFIG_FILE: &str = ".mindlayout.toml";
const ENV_PREFIX: &str = "MINDLAYOUT";

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub horizontal_spacing: Option<f64>,
    pub vertical_margin: Option<f64>,
    pub node_width: Option<f64>,
    pub node_height: Option<f64>,
    pub root_x: Option<f64>,
    pub root_y: Option<f64>,
    pub stacking: Option<StackingMode>,
}

/// Layout configuration for mindlayout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Horizontal gap between a parent's edge and its children column
    pub horizontal_spacing: f64,
    /// Minimum vertical gap between sibling subtrees
    pub vertical_margin: f64,
    /// Size assumed for nodes that have not been measured yet
    pub node_width: f64,
    pub node_height: f64,
    /// Root anchor
    pub root_x: f64,
    pub root_y: f64,
    pub stacking: StackingMode,
}

impl Default for Settings {
    fn default() -> Self {
        let params = LayoutParams::default();
        Self {
            horizontal_spacing: params.horizontal_spacing,
            vertical_margin: params.vertical_margin,
            node_width: 120.0,
            node_height: 40.0,
            root_x: 0.0,
            root_y: 0.0,
            stacking: params.stacking,
        }
    }
}

/// Get the XDG config directory for mindlayout.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindlayout").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindlayout.toml"))
}

pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            horizontal_spacing: self.horizontal_spacing,
            vertical_margin: self.vertical_margin,
            stacking: self.stacking,
        }
    }

    pub fn node_dimensions(&self) -> Dimensions {
        Dimensions::new(self.node_width, self.node_height)
    }

    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            horizontal_spacing: overlay.horizontal_spacing.unwrap_or(self.horizontal_spacing),
            vertical_margin: overlay.vertical_margin.unwrap_or(self.vertical_margin),
            node_width: overlay.node_width.unwrap_or(self.node_width),
            node_height: overlay.node_height.unwrap_or(self.node_height),
            root_x: overlay.root_x.unwrap_or(self.root_x),
            root_y: overlay.root_y.unwrap_or(self.root_y),
            stacking: overlay.stacking.unwrap_or(self.stacking),
        }
    }

    /// Load settings with layered precedence from the standard locations.
    ///
    /// `local_dir` is searched for `.mindlayout.toml`.
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        let local = local_dir.map(local_config_path);
        let settings = Self::load_layers(global.as_deref(), local.as_deref())?;
        let settings = Self::apply_env_overrides(settings, None)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Merge defaults with the given config files; missing files are skipped.
    pub fn load_layers(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();
        for path in [global, local].into_iter().flatten() {
            if path.exists() {
                debug!("load_layers: merging {}", path.display());
                current = current.merge_with(&load_raw_settings(path)?);
            }
        }
        Ok(current)
    }

    /// Apply `MINDLAYOUT_*` variables as explicit overrides.
    ///
    /// `source` replaces the process environment when given.
    pub fn apply_env_overrides(
        mut settings: Self,
        source: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).source(source))
            .build()
            .map_err(config_err)?;

        let float = |key: &str| -> Result<Option<f64>, ApplicationError> {
            match config.get_float(key) {
                Ok(v) => Ok(Some(v)),
                Err(ConfigError::NotFound(_)) => Ok(None),
                Err(e) => Err(config_err(e)),
            }
        };
        let overlay = RawSettings {
            horizontal_spacing: float("horizontal_spacing")?,
            vertical_margin: float("vertical_margin")?,
            node_width: float("node_width")?,
            node_height: float("node_height")?,
            root_x: float("root_x")?,
            root_y: float("root_y")?,
            stacking: match config.get_string("stacking") {
                Ok(v) => Some(v.parse().map_err(|e: String| ApplicationError::Config { message: e })?),
                Err(ConfigError::NotFound(_)) => None,
                Err(e) => return Err(config_err(e)),
            },
        };
        settings = settings.merge_with(&overlay);
        Ok(settings)
    }

    /// Reject values the layout cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let non_negative = [
            ("horizontal_spacing", self.horizontal_spacing),
            ("vertical_margin", self.vertical_margin),
        ];
        let positive = [("node_width", self.node_width), ("node_height", self.node_height)];
        let finite = [("root_x", self.root_x), ("root_y", self.root_y)];

        for (name, value) in finite.iter().chain(&non_negative).chain(&positive) {
            if !value.is_finite() {
                return Err(invalid(name, *value, "must be finite"));
            }
        }
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| *v < 0.0) {
            return Err(invalid(name, *value, "must not be negative"));
        }
        if let Some((name, value)) = positive.iter().find(|(_, v)| *v <= 0.0) {
            return Err(invalid(name, *value, "must be positive"));
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mindlayout configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindlayout/mindlayout.toml
#   Local:  <dir>/.mindlayout.toml
#   Env:    MINDLAYOUT_* environment variables

# Gap between a parent's edge and its children column
# horizontal_spacing = 80.0

# Minimum vertical gap between sibling subtrees
# vertical_margin = 20.0

# Size of nodes that have not been measured
# node_width = 120.0
# node_height = 40.0

# Root anchor
# root_x = 0.0
# root_y = 0.0

# Sibling stacking: "contour" (tight) or "bounding-box"
# stacking = "contour"
"#
        .to_string()
    }
}

fn invalid(name: &str, value: f64, reason: &str) -> ApplicationError {
    ApplicationError::Config {
        message: format!("{} = {} {}", name, value, reason),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_validating_then_ok() {
        let settings = Settings::default();
        assert_eq!(settings.horizontal_spacing, 80.0);
        assert_eq!(settings.vertical_margin, 20.0);
        assert_eq!(settings.stacking, StackingMode::Contour);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_only_given_fields_change() {
        let overlay = RawSettings {
            vertical_margin: Some(5.0),
            stacking: Some(StackingMode::BoundingBox),
            ..Default::default()
        };

        let result = Settings::default().merge_with(&overlay);

        assert_eq!(result.vertical_margin, 5.0);
        assert_eq!(result.stacking, StackingMode::BoundingBox);
        assert_eq!(result.horizontal_spacing, 80.0);
    }

    #[test]
    fn given_zero_node_width_when_validating_then_error() {
        let settings = Settings {
            node_width: 0.0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("node_width"));
    }

    #[test]
    fn given_env_map_when_applying_overrides_then_values_replace() {
        let mut env = config::Map::new();
        env.insert("MINDLAYOUT_VERTICAL_MARGIN".to_string(), "7".to_string());
        env.insert("MINDLAYOUT_STACKING".to_string(), "bounding-box".to_string());
        env.insert("OTHER_VERTICAL_MARGIN".to_string(), "99".to_string());

        let result = Settings::apply_env_overrides(Settings::default(), Some(env)).unwrap();

        assert_eq!(result.vertical_margin, 7.0);
        assert_eq!(result.stacking, StackingMode::BoundingBox);
        assert_eq!(result.node_height, 40.0);
    }
}
