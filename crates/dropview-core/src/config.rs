//! Viewer configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Initial camera position; the camera looks at the origin
    #[serde(default = "default_position")]
    pub position: [f32; 3],
    /// Orbit speed in radians per pixel of drag
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Fraction of the distance covered per wheel step
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            position: default_position(),
            sensitivity: default_sensitivity(),
            zoom_speed: default_zoom_speed(),
        }
    }
}

fn default_fov() -> f32 {
    50.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    10000.0
}

fn default_position() -> [f32; 3] {
    [10.0, 5.0, 6.0]
}

fn default_sensitivity() -> f32 {
    0.005
}

fn default_zoom_speed() -> f32 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Length of each axis line
    #[serde(default = "default_axes_length")]
    pub axes_length: f32,
    /// Side length of the square ground grid
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default = "default_grid_divisions")]
    pub grid_divisions: u32,
    /// Relative ambient light strength (1.0 = default brightness)
    #[serde(default = "default_intensity")]
    pub ambient_intensity: f32,
    /// Relative directional light strength
    #[serde(default = "default_intensity")]
    pub directional_intensity: f32,
    /// Clear color, sRGB
    #[serde(default = "default_background")]
    pub background: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            axes_length: default_axes_length(),
            grid_size: default_grid_size(),
            grid_divisions: default_grid_divisions(),
            ambient_intensity: default_intensity(),
            directional_intensity: default_intensity(),
            background: default_background(),
        }
    }
}

fn default_axes_length() -> f32 {
    5000.0
}

fn default_grid_size() -> f32 {
    100.0
}

fn default_grid_divisions() -> u32 {
    10
}

fn default_intensity() -> f32 {
    1.0
}

fn default_background() -> [f32; 3] {
    [0.1, 0.1, 0.12]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used natively when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,
    /// Maximum level forwarded to the browser console
    #[serde(default = "default_wasm_level")]
    pub wasm_max_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            wasm_max_level: default_wasm_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_wasm_level() -> String {
    "warn".to_string()
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: ViewerConfig = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("dropview.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.camera.fov_degrees, 50.0);
        assert_eq!(config.camera.position, [10.0, 5.0, 6.0]);
        assert_eq!(config.scene.axes_length, 5000.0);
        assert_eq!(config.scene.grid_divisions, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dropview.toml");
        std::fs::write(
            &path,
            "[camera]\nfov_degrees = 70.0\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.camera.fov_degrees, 70.0);
        assert_eq!(config.camera.far, 10000.0);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_serialized_defaults_load_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dropview.toml");
        let content = toml::to_string_pretty(&ViewerConfig::default()).unwrap();
        std::fs::write(&path, content).unwrap();
        assert_eq!(load_config(&path).unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dropview.toml");
        std::fs::write(&path, "[camera]\nfov_degrees = \"wide\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
