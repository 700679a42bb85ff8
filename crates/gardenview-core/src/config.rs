//! Viewer configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse viewer configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid viewer configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Initial orbit camera placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_azimuth")]
    pub azimuth_deg: f32,
    /// Polar angle measured from the up axis
    #[serde(default = "default_elevation")]
    pub elevation_deg: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_target")]
    pub target: [f32; 3],
    /// Whether zoom stops at `min_radius`
    #[serde(default = "default_true")]
    pub clamp_zoom: bool,
    #[serde(default = "default_min_radius")]
    pub min_radius: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            azimuth_deg: default_azimuth(),
            elevation_deg: default_elevation(),
            radius: default_radius(),
            target: default_target(),
            clamp_zoom: true,
            min_radius: default_min_radius(),
        }
    }
}

impl CameraConfig {
    /// Lower bound for the orbit radius, if zoom is clamped
    pub fn radius_floor(&self) -> Option<f32> {
        self.clamp_zoom.then_some(self.min_radius)
    }
}

fn default_azimuth() -> f32 {
    90.0
}

fn default_elevation() -> f32 {
    60.0
}

fn default_radius() -> f32 {
    15.0
}

fn default_target() -> [f32; 3] {
    [0.0, 2.0, 0.0]
}

fn default_min_radius() -> f32 {
    0.1
}

/// Discrete navigation steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_step")]
    pub pan_step: f32,
    #[serde(default = "default_step")]
    pub zoom_step: f32,
    /// Radians per pixel of pointer drag
    #[serde(default = "default_orbit_sensitivity")]
    pub orbit_sensitivity: f32,
    /// Radius change per scroll wheel line
    #[serde(default = "default_wheel_step")]
    pub wheel_step: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            pan_step: default_step(),
            zoom_step: default_step(),
            orbit_sensitivity: default_orbit_sensitivity(),
            wheel_step: default_wheel_step(),
        }
    }
}

fn default_step() -> f32 {
    50.0
}

fn default_orbit_sensitivity() -> f32 {
    0.005
}

fn default_wheel_step() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Uniform scale applied to statically placed assets
    #[serde(default = "default_framing_factor")]
    pub placement_scale: f32,
    /// Camera radius as a multiple of the bounding diagonal
    #[serde(default = "default_framing_factor")]
    pub radius_factor: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            placement_scale: default_framing_factor(),
            radius_factor: default_framing_factor(),
        }
    }
}

fn default_framing_factor() -> f32 {
    1.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default = "default_true")]
    pub show_ground: bool,
    /// Edge length of the square ground fixture
    #[serde(default = "default_ground_size")]
    pub ground_size: f32,
    /// CSS selector of the canvas the viewer binds to
    #[serde(default = "default_canvas")]
    pub canvas: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: default_ambient_intensity(),
            show_ground: true,
            ground_size: default_ground_size(),
            canvas: default_canvas(),
        }
    }
}

fn default_ambient_intensity() -> f32 {
    1.5
}

fn default_ground_size() -> f32 {
    50.0
}

fn default_canvas() -> String {
    "#viewer-canvas".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory (or URL prefix) named models are served from
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    /// Extension appended to model names that have none
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            default_extension: default_extension(),
        }
    }
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_extension() -> String {
    "glb".to_string()
}

/// Gallery upload endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_preview_endpoint")]
    pub preview_endpoint: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_upload_endpoint(),
            preview_endpoint: default_preview_endpoint(),
        }
    }
}

fn default_upload_endpoint() -> String {
    "/api/upload".to_string()
}

fn default_preview_endpoint() -> String {
    "/api/generate-preview".to_string()
}

impl ViewerConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would leave the camera or framing unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.camera.radius > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "camera.radius must be positive, got {}",
                self.camera.radius
            )));
        }
        if let Some(min) = self.camera.radius_floor() {
            if !(min > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "camera.min_radius must be positive, got {}",
                    min
                )));
            }
        }
        if !(self.framing.radius_factor > 0.0) || !(self.framing.placement_scale > 0.0) {
            return Err(ConfigError::ValidationError(
                "framing factors must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            info!(path = %path.display(), "Loaded viewer configuration");
            Ok(config)
        } else {
            info!(
                path = %path.display(),
                "Viewer configuration not found, using defaults"
            );
            Ok(Self::default())
        }
    }
}
