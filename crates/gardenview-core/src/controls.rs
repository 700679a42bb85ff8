//! Discrete camera navigation (pan buttons, zoom buttons)

use glam::Vec3;

use crate::camera::OrbitCamera;
use crate::config::{CameraConfig, NavigationConfig};
use crate::geometry::{ground_projected, WORLD_UP};

/// Camera-relative pan direction on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl PanDirection {
    /// Parse the names used by the page-level button handlers
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "forward" | "up" => Some(Self::Forward),
            "backward" | "down" => Some(Self::Backward),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Translates navigation commands into camera parameter updates.
///
/// Every operation is a no-op when no camera is mounted.
#[derive(Debug, Clone)]
pub struct CameraController {
    pan_step: f32,
    zoom_step: f32,
    orbit_sensitivity: f32,
    radius_floor: Option<f32>,
}

impl CameraController {
    pub fn new(navigation: &NavigationConfig, camera: &CameraConfig) -> Self {
        Self {
            pan_step: navigation.pan_step,
            zoom_step: navigation.zoom_step,
            orbit_sensitivity: navigation.orbit_sensitivity,
            radius_floor: camera.radius_floor(),
        }
    }

    /// Offset a pan of `step` units would apply to eye and target.
    ///
    /// Forward is the look direction flattened onto the ground plane and
    /// left is `normalize(forward x up)`.
    pub fn pan_offset(camera: &OrbitCamera, direction: PanDirection, step: f32) -> Vec3 {
        let forward = ground_projected(camera.look_direction());
        let left = forward.cross(WORLD_UP).normalize_or_zero();
        match direction {
            PanDirection::Forward => forward * step,
            PanDirection::Backward => forward * -step,
            PanDirection::Left => left * step,
            PanDirection::Right => left * -step,
        }
    }

    pub fn pan(&self, camera: Option<&mut OrbitCamera>, direction: PanDirection) {
        let Some(camera) = camera else { return };
        let offset = Self::pan_offset(camera, direction, self.pan_step);
        camera.translate(offset);
    }

    /// Change the orbit radius by `delta`, respecting the configured floor
    pub fn zoom(&self, camera: Option<&mut OrbitCamera>, delta: f32) {
        let Some(camera) = camera else { return };
        let radius = camera.radius + delta;
        camera.radius = match self.radius_floor {
            Some(floor) => radius.max(floor),
            None => radius,
        };
    }

    pub fn zoom_in(&self, camera: Option<&mut OrbitCamera>) {
        self.zoom(camera, -self.zoom_step);
    }

    pub fn zoom_out(&self, camera: Option<&mut OrbitCamera>) {
        self.zoom(camera, self.zoom_step);
    }

    /// Native drag-orbit from pointer motion in pixels
    pub fn orbit(&self, camera: Option<&mut OrbitCamera>, drag_x: f32, drag_y: f32) {
        let Some(camera) = camera else { return };
        camera.orbit(
            -drag_x * self.orbit_sensitivity,
            -drag_y * self.orbit_sensitivity,
        );
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(&NavigationConfig::default(), &CameraConfig::default())
    }
}
