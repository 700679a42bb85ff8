//! Orbit camera state

use glam::Vec3;

use crate::config::CameraConfig;

/// Keeps drag-orbit away from the poles where the view flips
const ELEVATION_LIMIT: f32 = 0.01;

/// Orbit camera parameterized around a target point.
///
/// Coordinates are Y-up. `azimuth` rotates around the up axis starting at +X,
/// `elevation` is the polar angle measured from +Y, and the position is
/// derived from target, angles and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub azimuth: f32,
    pub elevation: f32,
    pub radius: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, azimuth: f32, elevation: f32, radius: f32) -> Self {
        Self {
            target,
            azimuth,
            elevation,
            radius,
        }
    }

    /// Initial placement from configuration (angles given in degrees)
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            Vec3::from_array(config.target),
            config.azimuth_deg.to_radians(),
            config.elevation_deg.to_radians(),
            config.radius,
        )
    }

    /// World-space eye position
    pub fn position(&self) -> Vec3 {
        let (sin_el, cos_el) = self.elevation.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + self.radius * Vec3::new(cos_az * sin_el, cos_el, sin_az * sin_el)
    }

    /// Vector from the eye to the target
    pub fn look_direction(&self) -> Vec3 {
        self.target - self.position()
    }

    /// Move eye and target together, preserving the look direction
    pub fn translate(&mut self, offset: Vec3) {
        self.target += offset;
    }

    /// Rotate around the target by pointer drag deltas (radians)
    pub fn orbit(&mut self, delta_azimuth: f32, delta_elevation: f32) {
        self.azimuth += delta_azimuth;
        self.elevation = (self.elevation + delta_elevation)
            .clamp(ELEVATION_LIMIT, std::f32::consts::PI - ELEVATION_LIMIT);
    }

    /// Re-aim at `target` from the given angles and distance
    pub fn reset(&mut self, target: Vec3, azimuth: f32, elevation: f32, radius: f32) {
        *self = Self::new(target, azimuth, elevation, radius);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_default_placement() {
        let camera = OrbitCamera::default();
        assert_eq!(camera.target, Vec3::new(0.0, 2.0, 0.0));
        assert!((camera.azimuth - FRAC_PI_2).abs() < 1e-6);
        assert!((camera.elevation - FRAC_PI_3).abs() < 1e-6);
        assert_eq!(camera.radius, 15.0);
    }

    #[test]
    fn test_position_from_angles() {
        // azimuth 90 degrees puts the eye on +Z, elevation 60 degrees lifts it
        let camera = OrbitCamera::new(Vec3::ZERO, FRAC_PI_2, FRAC_PI_3, 10.0);
        let expected = Vec3::new(0.0, 10.0 * 0.5, 10.0 * FRAC_PI_3.sin());
        assert!(approx(camera.position(), expected));
        assert!((camera.position().distance(camera.target) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_translate_preserves_direction() {
        let mut camera = OrbitCamera::default();
        let before = camera.look_direction();
        let eye = camera.position();
        camera.translate(Vec3::new(3.0, 0.0, -4.0));
        assert!(approx(camera.look_direction(), before));
        assert!(approx(camera.position(), eye + Vec3::new(3.0, 0.0, -4.0)));
    }

    #[test]
    fn test_orbit_clamps_elevation() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, -10.0);
        assert!(camera.elevation > 0.0);
        camera.orbit(0.0, 10.0);
        assert!(camera.elevation < std::f32::consts::PI);
    }
}
